//! Multi-party approval engine (event-sourced).
//!
//! Privileged token operations (transfer out of the wallet's treasury, burn)
//! are submitted as proposals and only reach the ledger once a quorum of
//! registered approvers has confirmed them.
//!
//! - [`ApproverSet`]: fixed approvers + quorum, validated at construction
//! - [`ApprovalEngine`]: proposal lifecycle as a pure aggregate
//! - [`MultisigWallet`]: engine + [`Ledger`](quorumtoken_ledger::Ledger), with
//!   an uncommitted journal of everything that happened

pub mod approvers;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod wallet;

pub use approvers::ApproverSet;
pub use engine::{
    ApprovalCommand, ApprovalEngine, ApprovalEvent, Confirm, ConfirmationRevoked, Execute,
    Propose, ProposalConfirmed, ProposalExecuted, ProposalSubmitted, Revoke,
};
pub use error::{ApprovalError, ConfigError};
pub use proposal::{Proposal, ProposalKind};
pub use wallet::{
    Confirmation, ExecutionFailed, MultisigWallet, WalletConfig, WalletCreated, WalletEvent,
};
