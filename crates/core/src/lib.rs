//! `quorumtoken-core`: domain building blocks shared by the ledger and the
//! approval engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{execute, Aggregate, AggregateRoot, ExpectedVersion};
pub use error::IdError;
pub use id::{AccountId, ProposalId, WalletId};

/// Token quantity in the smallest indivisible unit.
pub type Amount = u64;
