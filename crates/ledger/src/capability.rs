use chrono::{DateTime, Utc};

use quorumtoken_core::{AccountId, Amount};

use crate::error::LedgerError;
use crate::ledger::{Burn, LedgerCommand, LedgerEvent, Mint, TokenMetadata, Transfer};

/// Balance-accounting capability consumed by the approval engine.
///
/// Every mutation returns the events it applied so callers can record them
/// in an audit log; a failed mutation applies nothing. `replay` re-applies a
/// previously returned event when state is rebuilt from that log.
pub trait Ledger {
    fn metadata(&self) -> &TokenMetadata;

    /// Balance of `account`; unknown accounts hold zero.
    fn balance_of(&self, account: &AccountId) -> Amount;

    fn total_supply(&self) -> Amount;

    fn submit(&mut self, command: LedgerCommand) -> Result<Vec<LedgerEvent>, LedgerError>;

    fn replay(&mut self, event: &LedgerEvent);

    fn mint(
        &mut self,
        account: AccountId,
        amount: Amount,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.submit(LedgerCommand::Mint(Mint {
            account,
            amount,
            occurred_at,
        }))
    }

    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.submit(LedgerCommand::Transfer(Transfer {
            from,
            to,
            amount,
            occurred_at,
        }))
    }

    fn burn(
        &mut self,
        account: AccountId,
        amount: Amount,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.submit(LedgerCommand::Burn(Burn {
            account,
            amount,
            occurred_at,
        }))
    }
}
