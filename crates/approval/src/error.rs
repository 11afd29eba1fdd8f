use thiserror::Error;

use quorumtoken_core::{AccountId, ProposalId};
use quorumtoken_ledger::LedgerError;

/// Invalid construction arguments. Fatal: no engine is created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("approver list is empty")]
    EmptyApprovers,

    #[error("approver list contains the nil identity")]
    NilApprover,

    #[error("approver {0} is listed more than once")]
    DuplicateApprover(AccountId),

    #[error("quorum {quorum} is outside 1..={approvers}")]
    QuorumOutOfRange { quorum: u32, approvers: usize },

    #[error("approver {0} is the wallet's own treasury account")]
    TreasuryApprover(AccountId),
}

/// Rejections and failures of proposal operations.
///
/// Every variant except `Ledger` is raised before any state changes.
/// `Ledger` is raised after the proposal was marked executed; it stays
/// executed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} is not a registered approver")]
    NotAuthorized(AccountId),

    #[error("proposal {0} not found")]
    NotFound(ProposalId),

    #[error("proposal {0} has already been executed")]
    AlreadyExecuted(ProposalId),

    #[error("{approver} has already confirmed proposal {proposal_id}")]
    AlreadyConfirmed {
        proposal_id: ProposalId,
        approver: AccountId,
    },

    #[error("{approver} has not confirmed proposal {proposal_id}")]
    NotConfirmed {
        proposal_id: ProposalId,
        approver: AccountId,
    },

    #[error("proposal {proposal_id} has {confirmations} of {quorum} required confirmations")]
    QuorumNotMet {
        proposal_id: ProposalId,
        confirmations: usize,
        quorum: u32,
    },

    #[error("execution failed in the ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid wallet history: {0}")]
    InvalidHistory(String),
}
