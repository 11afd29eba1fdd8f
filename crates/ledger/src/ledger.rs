use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorumtoken_core::{AccountId, Aggregate, AggregateRoot, Amount, WalletId, execute};
use quorumtoken_events::Event;

use crate::capability::Ledger;
use crate::error::LedgerError;

/// Descriptive token attributes (ERC-20 style).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Quorum Token".to_string(),
            symbol: "QRM".to_string(),
            decimals: 18,
        }
    }
}

/// Aggregate root: per-account balances and total supply of one token.
///
/// Invariant: `total_supply == Σ balances` after every applied event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLedger {
    id: WalletId,
    metadata: TokenMetadata,
    balances: HashMap<AccountId, Amount>,
    total_supply: Amount,
    version: u64,
}

impl TokenLedger {
    pub fn new(id: WalletId, metadata: TokenMetadata) -> Self {
        Self {
            id,
            metadata,
            balances: HashMap::new(),
            total_supply: 0,
            version: 0,
        }
    }

    /// Accounts with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    fn credit(&mut self, account: AccountId, amount: Amount) {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, account: AccountId, amount: Amount) {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_sub(amount);
    }

    fn ensure_funds(&self, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(&account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account,
                available,
                requested: amount,
            });
        }
        Ok(())
    }
}

impl AggregateRoot for TokenLedger {
    type Id = WalletId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: create `amount` new tokens on `account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    pub account: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: move `amount` from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: destroy `amount` held by `account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burn {
    pub account: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Mint(Mint),
    Transfer(Transfer),
    Burn(Burn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minted {
    pub account: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transferred {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burned {
    pub account: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Minted(Minted),
    Transferred(Transferred),
    Burned(Burned),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::Minted(_) => "ledger.minted",
            LedgerEvent::Transferred(_) => "ledger.transferred",
            LedgerEvent::Burned(_) => "ledger.burned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::Minted(e) => e.occurred_at,
            LedgerEvent::Transferred(e) => e.occurred_at,
            LedgerEvent::Burned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for TokenLedger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::Minted(e) => {
                self.credit(e.account, e.amount);
                self.total_supply = self.total_supply.saturating_add(e.amount);
            }
            LedgerEvent::Transferred(e) => {
                self.debit(e.from, e.amount);
                self.credit(e.to, e.amount);
            }
            LedgerEvent::Burned(e) => {
                self.debit(e.account, e.amount);
                self.total_supply = self.total_supply.saturating_sub(e.amount);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::Mint(cmd) => {
                self.total_supply
                    .checked_add(cmd.amount)
                    .ok_or(LedgerError::SupplyOverflow)?;
                Ok(vec![LedgerEvent::Minted(Minted {
                    account: cmd.account,
                    amount: cmd.amount,
                    occurred_at: cmd.occurred_at,
                })])
            }
            LedgerCommand::Transfer(cmd) => {
                self.ensure_funds(cmd.from, cmd.amount)?;
                Ok(vec![LedgerEvent::Transferred(Transferred {
                    from: cmd.from,
                    to: cmd.to,
                    amount: cmd.amount,
                    occurred_at: cmd.occurred_at,
                })])
            }
            LedgerCommand::Burn(cmd) => {
                self.ensure_funds(cmd.account, cmd.amount)?;
                Ok(vec![LedgerEvent::Burned(Burned {
                    account: cmd.account,
                    amount: cmd.amount,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Ledger for TokenLedger {
    fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn submit(&mut self, command: LedgerCommand) -> Result<Vec<LedgerEvent>, LedgerError> {
        execute(self, &command)
    }

    fn replay(&mut self, event: &LedgerEvent) {
        self.apply(event);
    }
}
