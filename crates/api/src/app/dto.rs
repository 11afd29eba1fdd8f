use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorumtoken_approval::{Proposal, ProposalKind};
use quorumtoken_core::{AccountId, Amount, ProposalId};
use quorumtoken_ledger::TokenMetadata;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProposeRequest {
    pub kind: ProposalKind,
}

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    /// Event type prefix, e.g. `ledger.`.
    pub event_type: Option<String>,
    pub proposal_id: Option<ProposalId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProposalView {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub kind: ProposalKind,
    pub confirmations: Vec<AccountId>,
    pub confirmation_count: usize,
    pub executed: bool,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Proposal> for ProposalView {
    fn from(p: &Proposal) -> Self {
        Self {
            id: p.id(),
            proposer: p.proposer(),
            kind: p.kind().clone(),
            confirmations: p.confirmations().copied().collect(),
            confirmation_count: p.confirmation_count(),
            executed: p.is_executed(),
            submitted_at: p.submitted_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProposalList {
    pub count: usize,
    pub items: Vec<ProposalView>,
}

#[derive(Debug, Serialize)]
pub struct ApproversView {
    pub approvers: Vec<AccountId>,
    pub quorum: u32,
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub account: AccountId,
    pub balance: Amount,
}

#[derive(Debug, Serialize)]
pub struct SupplyView {
    pub total_supply: Amount,
    pub treasury: AccountId,
    pub treasury_balance: Amount,
    pub token: TokenMetadata,
}
