//! Approval engine + ledger behind one state object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorumtoken_core::{AccountId, Aggregate, Amount, ProposalId, WalletId, execute};
use quorumtoken_events::Event;
use quorumtoken_ledger::{Ledger, LedgerEvent, TokenLedger, TokenMetadata};

use crate::approvers::ApproverSet;
use crate::engine::{
    ApprovalCommand, ApprovalEngine, ApprovalEvent, Confirm, Execute, Propose, ProposalExecuted,
    Revoke,
};
use crate::error::{ApprovalError, ConfigError};
use crate::proposal::{Proposal, ProposalKind};

/// Construction arguments of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub approvers: Vec<AccountId>,
    pub quorum: u32,
    /// Minted to the wallet's treasury at creation.
    #[serde(default)]
    pub initial_supply: Amount,
    #[serde(default)]
    pub token: TokenMetadata,
}

impl WalletConfig {
    /// Approver set of the wallet `wallet_id`. Its treasury cannot approve.
    pub fn approver_set(&self, wallet_id: WalletId) -> Result<ApproverSet, ConfigError> {
        let approvers = ApproverSet::new(self.approvers.clone(), self.quorum)?;
        ensure_treasury_excluded(&approvers, wallet_id)?;
        Ok(approvers)
    }
}

fn ensure_treasury_excluded(approvers: &ApproverSet, wallet_id: WalletId) -> Result<(), ConfigError> {
    let treasury = wallet_id.treasury();
    if approvers.contains(&treasury) {
        return Err(ConfigError::TreasuryApprover(treasury));
    }
    Ok(())
}

/// First event of every wallet stream; carries the closed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCreated {
    pub wallet_id: WalletId,
    pub approvers: Vec<AccountId>,
    pub quorum: u32,
    pub token: TokenMetadata,
    pub treasury: AccountId,
    pub occurred_at: DateTime<Utc>,
}

/// The ledger refused an executed proposal. The proposal stays executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailed {
    pub proposal_id: ProposalId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Everything that can appear in a wallet's audit stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
    WalletCreated(WalletCreated),
    Approval(ApprovalEvent),
    Ledger(LedgerEvent),
    ExecutionFailed(ExecutionFailed),
}

impl WalletEvent {
    /// Proposal this event is about, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            WalletEvent::Approval(e) => Some(e.proposal_id()),
            WalletEvent::ExecutionFailed(e) => Some(e.proposal_id),
            WalletEvent::WalletCreated(_) | WalletEvent::Ledger(_) => None,
        }
    }
}

impl Event for WalletEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WalletEvent::WalletCreated(_) => "wallet.created",
            WalletEvent::Approval(e) => e.event_type(),
            WalletEvent::Ledger(e) => e.event_type(),
            WalletEvent::ExecutionFailed(_) => "approval.proposal.execution_failed",
        }
    }

    fn version(&self) -> u32 {
        match self {
            WalletEvent::Approval(e) => e.version(),
            WalletEvent::Ledger(e) => e.version(),
            WalletEvent::WalletCreated(_) | WalletEvent::ExecutionFailed(_) => 1,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WalletEvent::WalletCreated(e) => e.occurred_at,
            WalletEvent::Approval(e) => e.occurred_at(),
            WalletEvent::Ledger(e) => e.occurred_at(),
            WalletEvent::ExecutionFailed(e) => e.occurred_at,
        }
    }
}

/// Result of a successful confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Confirmation {
    /// Recorded; quorum not reached yet.
    Pending { confirmations: usize, quorum: u32 },
    /// Quorum reached and the ledger operation ran.
    Executed,
}

/// A multi-signature token wallet: proposals gate every movement out of the
/// treasury and every burn.
///
/// Each operation appends what it did to an uncommitted journal, drained with
/// [`take_uncommitted`](Self::take_uncommitted). A rejected operation
/// journals nothing and changes nothing. An execution the ledger refuses
/// journals the execution followed by [`ExecutionFailed`] and returns the
/// ledger error.
#[derive(Debug, Clone)]
pub struct MultisigWallet<L = TokenLedger> {
    id: WalletId,
    engine: ApprovalEngine,
    ledger: L,
    uncommitted: Vec<WalletEvent>,
}

impl<L: Ledger> MultisigWallet<L> {
    /// Validate the configuration, then mint the initial supply to the
    /// wallet's own treasury account.
    pub fn create(
        id: WalletId,
        config: &WalletConfig,
        ledger: L,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, ApprovalError> {
        let approvers = config.approver_set(id)?;
        let treasury = id.treasury();

        let mut wallet = Self {
            id,
            engine: ApprovalEngine::new(id, approvers),
            ledger,
            uncommitted: Vec::new(),
        };

        wallet.uncommitted.push(WalletEvent::WalletCreated(WalletCreated {
            wallet_id: id,
            approvers: config.approvers.clone(),
            quorum: config.quorum,
            token: wallet.ledger.metadata().clone(),
            treasury,
            occurred_at,
        }));

        if config.initial_supply > 0 {
            let minted = wallet
                .ledger
                .mint(treasury, config.initial_supply, occurred_at)?;
            wallet
                .uncommitted
                .extend(minted.into_iter().map(WalletEvent::Ledger));
        }

        Ok(wallet)
    }

    /// Rebuild a wallet from its recorded stream. `ledger` must be empty.
    pub fn from_history(
        ledger: L,
        history: impl IntoIterator<Item = WalletEvent>,
    ) -> Result<Self, ApprovalError> {
        let mut events = history.into_iter();

        let created = match events.next() {
            Some(WalletEvent::WalletCreated(created)) => created,
            Some(other) => {
                return Err(ApprovalError::InvalidHistory(format!(
                    "stream starts with {} instead of wallet.created",
                    other.event_type()
                )));
            }
            None => return Err(ApprovalError::InvalidHistory("stream is empty".to_string())),
        };

        let approvers = ApproverSet::new(created.approvers, created.quorum)?;
        ensure_treasury_excluded(&approvers, created.wallet_id)?;
        let mut wallet = Self {
            id: created.wallet_id,
            engine: ApprovalEngine::new(created.wallet_id, approvers),
            ledger,
            uncommitted: Vec::new(),
        };

        for event in events {
            match event {
                WalletEvent::WalletCreated(_) => {
                    return Err(ApprovalError::InvalidHistory(
                        "wallet.created appears more than once".to_string(),
                    ));
                }
                WalletEvent::Approval(e) => {
                    if let ApprovalEvent::ProposalSubmitted(submitted) = &e {
                        let expected = wallet.engine.next_id();
                        if submitted.proposal_id != expected || expected.next().is_none() {
                            return Err(ApprovalError::InvalidHistory(format!(
                                "proposal {} submitted where {expected} was next",
                                submitted.proposal_id
                            )));
                        }
                    }
                    wallet.engine.apply(&e)
                }
                WalletEvent::Ledger(e) => wallet.ledger.replay(&e),
                WalletEvent::ExecutionFailed(_) => {}
            }
        }

        Ok(wallet)
    }

    pub fn propose(
        &mut self,
        caller: AccountId,
        kind: ProposalKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<ProposalId, ApprovalError> {
        let id = self.engine.next_id();
        self.run(ApprovalCommand::Propose(Propose {
            caller,
            kind,
            occurred_at,
        }))?;
        Ok(id)
    }

    pub fn confirm(
        &mut self,
        caller: AccountId,
        proposal_id: ProposalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Confirmation, ApprovalError> {
        let events = self.run(ApprovalCommand::Confirm(Confirm {
            caller,
            proposal_id,
            occurred_at,
        }))?;

        if events
            .iter()
            .any(|e| matches!(e, ApprovalEvent::ProposalExecuted(_)))
        {
            return Ok(Confirmation::Executed);
        }

        let proposal = self.engine.proposal(proposal_id)?;
        Ok(Confirmation::Pending {
            confirmations: proposal.confirmation_count(),
            quorum: self.engine.approvers().quorum(),
        })
    }

    pub fn execute(
        &mut self,
        caller: AccountId,
        proposal_id: ProposalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        self.run(ApprovalCommand::Execute(Execute {
            caller,
            proposal_id,
            occurred_at,
        }))?;
        Ok(())
    }

    pub fn revoke(
        &mut self,
        caller: AccountId,
        proposal_id: ProposalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        self.run(ApprovalCommand::Revoke(Revoke {
            caller,
            proposal_id,
            occurred_at,
        }))?;
        Ok(())
    }

    /// Drain the events recorded since the last call.
    pub fn take_uncommitted(&mut self) -> Vec<WalletEvent> {
        std::mem::take(&mut self.uncommitted)
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn treasury(&self) -> AccountId {
        self.id.treasury()
    }

    pub fn approvers(&self) -> &[AccountId] {
        self.engine.approvers().approvers()
    }

    pub fn quorum(&self) -> u32 {
        self.engine.approvers().quorum()
    }

    pub fn proposal_count(&self) -> usize {
        self.engine.proposal_count()
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal, ApprovalError> {
        self.engine.proposal(id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.engine.proposals()
    }

    pub fn has_confirmed(&self, id: ProposalId, approver: &AccountId) -> Result<bool, ApprovalError> {
        Ok(self.engine.proposal(id)?.has_confirmed(approver))
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn metadata(&self) -> &TokenMetadata {
        self.ledger.metadata()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Decide + apply on the engine, journal the result, then settle any
    /// execution against the ledger. The proposal is already marked executed
    /// when the ledger is called.
    fn run(&mut self, command: ApprovalCommand) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        let events = execute(&mut self.engine, &command)?;
        self.uncommitted
            .extend(events.iter().cloned().map(WalletEvent::Approval));

        for event in &events {
            if let ApprovalEvent::ProposalExecuted(executed) = event {
                self.settle(executed)?;
            }
        }

        Ok(events)
    }

    fn settle(&mut self, executed: &ProposalExecuted) -> Result<(), ApprovalError> {
        let kind = self.engine.proposal(executed.proposal_id)?.kind().clone();
        let at = executed.occurred_at;

        let outcome = match kind {
            ProposalKind::Transfer { to, amount } => {
                self.ledger.transfer(self.id.treasury(), to, amount, at)
            }
            ProposalKind::Burn { from, amount } => self.ledger.burn(from, amount, at),
        };

        match outcome {
            Ok(ledger_events) => {
                self.uncommitted
                    .extend(ledger_events.into_iter().map(WalletEvent::Ledger));
                Ok(())
            }
            Err(err) => {
                self.uncommitted
                    .push(WalletEvent::ExecutionFailed(ExecutionFailed {
                        proposal_id: executed.proposal_id,
                        reason: err.to_string(),
                        occurred_at: at,
                    }));
                Err(err.into())
            }
        }
    }
}
