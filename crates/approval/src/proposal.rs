use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorumtoken_core::{AccountId, Amount, ProposalId};

/// The privileged ledger operation a proposal asks for. Fixed at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// Pay `amount` out of the wallet's treasury to `to`.
    Transfer { to: AccountId, amount: Amount },
    /// Destroy `amount` held by `from`.
    Burn { from: AccountId, amount: Amount },
}

impl ProposalKind {
    pub fn amount(&self) -> Amount {
        match self {
            ProposalKind::Transfer { amount, .. } | ProposalKind::Burn { amount, .. } => *amount,
        }
    }
}

/// One submitted operation and its approval state.
///
/// `confirmations` is a set so an approver is never counted twice and can
/// revoke by identity. Once `executed` is set the proposal is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub(crate) id: ProposalId,
    pub(crate) proposer: AccountId,
    pub(crate) kind: ProposalKind,
    pub(crate) confirmations: BTreeSet<AccountId>,
    pub(crate) executed: bool,
    pub(crate) submitted_at: DateTime<Utc>,
}

impl Proposal {
    pub(crate) fn new(
        id: ProposalId,
        proposer: AccountId,
        kind: ProposalKind,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            proposer,
            kind,
            confirmations: BTreeSet::new(),
            executed: false,
            submitted_at,
        }
    }

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn proposer(&self) -> AccountId {
        self.proposer
    }

    pub fn kind(&self) -> &ProposalKind {
        &self.kind
    }

    pub fn confirmations(&self) -> impl Iterator<Item = &AccountId> {
        self.confirmations.iter()
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    pub fn has_confirmed(&self, approver: &AccountId) -> bool {
        self.confirmations.contains(approver)
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_tagged_snake_case() {
        let to = AccountId::new();
        let kind = ProposalKind::Transfer { to, amount: 100 };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["transfer"]["amount"], 100);
        assert_eq!(json["transfer"]["to"], to.to_string());

        let back: ProposalKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
        assert_eq!(back.amount(), 100);
    }

    #[test]
    fn new_proposal_is_pending_and_unconfirmed() {
        let p = Proposal::new(
            ProposalId::FIRST,
            AccountId::new(),
            ProposalKind::Burn { from: AccountId::new(), amount: 5 },
            Utc::now(),
        );
        assert!(!p.is_executed());
        assert_eq!(p.confirmation_count(), 0);
        assert_eq!(p.confirmations().count(), 0);
    }
}
