//! Token ledger (balances + total supply, event-sourced).
//!
//! Pure domain logic only: no IO, no persistence concerns. The approval
//! engine consumes the ledger through the [`Ledger`] capability trait;
//! [`TokenLedger`] is the stock implementation.

pub mod capability;
pub mod error;
pub mod ledger;

pub use capability::Ledger;
pub use error::LedgerError;
pub use ledger::{
    Burn, Burned, LedgerCommand, LedgerEvent, Mint, Minted, TokenLedger, TokenMetadata, Transfer,
    Transferred,
};
