//! Strongly-typed identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdError;

/// Identity of a ledger account holder (approver, recipient, treasury).
///
/// Identities are opaque and only compared for equality/order. The nil UUID
/// is reserved as the "null identity" and is never a valid approver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

/// Identifier of one wallet instance (approval engine + ledger).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a fresh, time-ordered (UUIDv7) identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// `true` for the reserved nil identifier.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s).map_err(|e| IdError::malformed($name, e.to_string()))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(AccountId, "AccountId");
impl_uuid_newtype!(WalletId, "WalletId");

impl WalletId {
    /// The ledger account owned by the wallet itself.
    ///
    /// Shares the wallet's UUID so it is stable across restarts and never
    /// collides with another wallet's treasury.
    pub fn treasury(&self) -> AccountId {
        AccountId(self.0)
    }
}

/// Sequential proposal number, assigned by the engine at submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(u64);

impl ProposalId {
    pub const FIRST: ProposalId = ProposalId(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id allocated after this one, or `None` once ids are exhausted.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl core::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProposalId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| IdError::malformed("ProposalId", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_round_trips_through_display() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_account_id_is_rejected() {
        let err = "not-a-uuid".parse::<AccountId>().unwrap_err();
        assert!(matches!(err, IdError::Malformed { kind: "AccountId", .. }));
    }

    #[test]
    fn nil_identity_is_detected() {
        assert!(AccountId::from_uuid(Uuid::nil()).is_nil());
        assert!(!AccountId::new().is_nil());
    }

    #[test]
    fn treasury_is_stable_per_wallet() {
        let wallet = WalletId::new();
        assert_eq!(wallet.treasury(), wallet.treasury());
        assert_ne!(wallet.treasury(), WalletId::new().treasury());
    }

    #[test]
    fn proposal_ids_are_sequential() {
        assert_eq!(ProposalId::FIRST.value(), 0);
        assert_eq!(ProposalId::FIRST.next(), Some(ProposalId::new(1)));
        assert_eq!(ProposalId::new(u64::MAX).next(), None);
        assert_eq!("42".parse::<ProposalId>().unwrap(), ProposalId::new(42));
        assert!("-1".parse::<ProposalId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ProposalId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
