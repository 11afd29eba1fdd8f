use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use quorumtoken_core::AccountId;

use crate::error::ConfigError;

/// The registered approvers and the number of distinct confirmations a
/// proposal needs.
///
/// Closed configuration: there is no way to add, remove or rotate approvers
/// after construction. Invariant: `1 <= quorum <= approvers.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApproverSet {
    approvers: Vec<AccountId>,
    quorum: u32,
}

impl ApproverSet {
    /// Validate and build. Approver order is preserved for listing.
    pub fn new(approvers: Vec<AccountId>, quorum: u32) -> Result<Self, ConfigError> {
        if approvers.is_empty() {
            return Err(ConfigError::EmptyApprovers);
        }

        let mut seen = HashSet::with_capacity(approvers.len());
        for approver in &approvers {
            if approver.is_nil() {
                return Err(ConfigError::NilApprover);
            }
            if !seen.insert(*approver) {
                return Err(ConfigError::DuplicateApprover(*approver));
            }
        }

        if quorum == 0 || quorum as usize > approvers.len() {
            return Err(ConfigError::QuorumOutOfRange {
                quorum,
                approvers: approvers.len(),
            });
        }

        Ok(Self { approvers, quorum })
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.approvers.contains(account)
    }

    pub fn approvers(&self) -> &[AccountId] {
        &self.approvers
    }

    pub fn len(&self) -> usize {
        self.approvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approvers.is_empty()
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    /// Whether `confirmations` distinct approvals reach the quorum.
    pub fn is_met(&self, confirmations: usize) -> bool {
        confirmations >= self.quorum as usize
    }
}

#[derive(Deserialize)]
struct RawApproverSet {
    approvers: Vec<AccountId>,
    quorum: u32,
}

impl<'de> Deserialize<'de> for ApproverSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawApproverSet::deserialize(deserializer)?;
        ApproverSet::new(raw.approvers, raw.quorum).map_err(serde::de::Error::custom)
    }
}
