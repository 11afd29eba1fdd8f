//! Wallet service: the caller-facing entry point.
//!
//! Wraps one [`MultisigWallet`] and runs every operation through the same
//! pipeline:
//!
//! ```text
//! lock wallet
//!   ↓
//! 1. clone the live state into a draft
//!   ↓
//! 2. run the operation on the draft (decide + apply, incl. ledger settlement)
//!   ↓
//! 3. append the draft's events in one batch (ExpectedVersion::Exact)
//!   ↓
//! 4. swap the draft in as the live state
//!   ↓
//! 5. publish the committed events on the bus
//! ```
//!
//! A rejected operation records nothing and leaves the live state untouched.
//! If the append fails the draft is dropped, so memory never runs ahead of
//! the store. Operations are serialized by the lock; the auto-execution chain
//! inside `confirm` is part of the same unit.

use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use quorumtoken_approval::{
    ApprovalError, Confirmation, MultisigWallet, Proposal, ProposalKind, WalletConfig, WalletEvent,
};
use quorumtoken_core::{AccountId, Amount, ExpectedVersion, ProposalId, WalletId};
use quorumtoken_events::{EventBus, EventEnvelope, Subscription};
use quorumtoken_ledger::{Ledger, TokenLedger, TokenMetadata};

use crate::event_store::{
    EventFilter, EventQueryResult, EventStore, EventStoreError, Pagination, StoredEvent,
    UncommittedEvent, query_events,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("stored event {sequence_number} could not be decoded: {reason}")]
    Decode { sequence_number: u64, reason: String },

    /// The events were committed; only distribution failed.
    #[error("event publication failed: {0}")]
    Publish(String),

    #[error("wallet state lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
struct Live<L> {
    wallet: MultisigWallet<L>,
    version: u64,
}

/// Serialized access to one persisted wallet.
#[derive(Debug)]
pub struct WalletService<S, B, L = TokenLedger> {
    wallet_id: WalletId,
    store: S,
    bus: B,
    live: Mutex<Live<L>>,
}

impl<S, B> WalletService<S, B, TokenLedger>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Open with the built-in token ledger.
    pub fn open(
        store: S,
        bus: B,
        wallet_id: WalletId,
        config: &WalletConfig,
    ) -> Result<Self, ServiceError> {
        let ledger = TokenLedger::new(wallet_id, config.token.clone());
        Self::open_with_ledger(store, bus, wallet_id, config, ledger)
    }
}

impl<S, B, L> WalletService<S, B, L>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    L: Ledger + Clone,
{
    /// Rebuild the wallet from its stream, or create it from `config` when
    /// the stream is empty. `ledger` must be empty.
    ///
    /// An existing stream is authoritative: `config` is only used to create.
    pub fn open_with_ledger(
        store: S,
        bus: B,
        wallet_id: WalletId,
        config: &WalletConfig,
        ledger: L,
    ) -> Result<Self, ServiceError> {
        let history = store.load_stream(wallet_id)?;
        validate_loaded_stream(wallet_id, &history)?;

        if history.is_empty() {
            let mut wallet = MultisigWallet::create(wallet_id, config, ledger, Utc::now())?;
            let events = wallet.take_uncommitted();

            let service = Self {
                wallet_id,
                store,
                bus,
                live: Mutex::new(Live { wallet, version: 0 }),
            };
            let committed = service.persist(wallet_id, &events, 0)?;
            {
                let mut live = service.live.lock().map_err(|_| ServiceError::Poisoned)?;
                live.version = stream_version(&committed);
            }
            service.publish(&committed)?;

            tracing::info!(
                wallet_id = %wallet_id,
                approvers = config.approvers.len(),
                quorum = config.quorum,
                initial_supply = config.initial_supply,
                "wallet created"
            );
            return Ok(service);
        }

        let version = stream_version(&history);
        let events = decode_history(&history)?;
        let wallet = MultisigWallet::from_history(ledger, events)?;

        if wallet.approvers() != config.approvers.as_slice() || wallet.quorum() != config.quorum {
            tracing::warn!(
                wallet_id = %wallet_id,
                "configured approvers differ from the recorded wallet; using the recorded set"
            );
        }

        tracing::info!(
            wallet_id = %wallet_id,
            version,
            proposals = wallet.proposal_count(),
            "wallet rebuilt from event stream"
        );

        Ok(Self {
            wallet_id,
            store,
            bus,
            live: Mutex::new(Live { wallet, version }),
        })
    }

    pub fn propose(&self, caller: AccountId, kind: ProposalKind) -> Result<ProposalId, ServiceError> {
        let id = self.transact(|w| w.propose(caller, kind, Utc::now()))?;
        tracing::info!(wallet_id = %self.wallet_id, proposal_id = %id, caller = %caller, "proposal submitted");
        Ok(id)
    }

    pub fn confirm(&self, caller: AccountId, proposal_id: ProposalId) -> Result<Confirmation, ServiceError> {
        let outcome = self.transact(|w| w.confirm(caller, proposal_id, Utc::now()))?;
        match outcome {
            Confirmation::Executed => tracing::info!(
                wallet_id = %self.wallet_id,
                proposal_id = %proposal_id,
                caller = %caller,
                "proposal confirmed and executed"
            ),
            Confirmation::Pending { confirmations, quorum } => tracing::info!(
                wallet_id = %self.wallet_id,
                proposal_id = %proposal_id,
                caller = %caller,
                confirmations,
                quorum,
                "proposal confirmed"
            ),
        }
        Ok(outcome)
    }

    pub fn execute(&self, caller: AccountId, proposal_id: ProposalId) -> Result<(), ServiceError> {
        self.transact(|w| w.execute(caller, proposal_id, Utc::now()))?;
        tracing::info!(wallet_id = %self.wallet_id, proposal_id = %proposal_id, caller = %caller, "proposal executed");
        Ok(())
    }

    pub fn revoke(&self, caller: AccountId, proposal_id: ProposalId) -> Result<(), ServiceError> {
        self.transact(|w| w.revoke(caller, proposal_id, Utc::now()))?;
        tracing::info!(wallet_id = %self.wallet_id, proposal_id = %proposal_id, caller = %caller, "confirmation revoked");
        Ok(())
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    /// Current stream version (sequence number of the last committed event).
    pub fn version(&self) -> Result<u64, ServiceError> {
        let live = self.live.lock().map_err(|_| ServiceError::Poisoned)?;
        Ok(live.version)
    }

    pub fn approvers(&self) -> Result<(Vec<AccountId>, u32), ServiceError> {
        self.read(|w| (w.approvers().to_vec(), w.quorum()))
    }

    pub fn proposal_count(&self) -> Result<usize, ServiceError> {
        self.read(|w| w.proposal_count())
    }

    pub fn proposal(&self, id: ProposalId) -> Result<Proposal, ServiceError> {
        Ok(self.read(|w| w.proposal(id).cloned())??)
    }

    pub fn proposals(&self) -> Result<Vec<Proposal>, ServiceError> {
        self.read(|w| w.proposals().cloned().collect())
    }

    pub fn has_confirmed(&self, id: ProposalId, approver: AccountId) -> Result<bool, ServiceError> {
        Ok(self.read(|w| w.has_confirmed(id, &approver))??)
    }

    pub fn balance_of(&self, account: AccountId) -> Result<Amount, ServiceError> {
        self.read(|w| w.balance_of(&account))
    }

    pub fn total_supply(&self) -> Result<Amount, ServiceError> {
        self.read(|w| w.total_supply())
    }

    pub fn metadata(&self) -> Result<TokenMetadata, ServiceError> {
        self.read(|w| w.metadata().clone())
    }

    pub fn treasury(&self) -> AccountId {
        self.wallet_id.treasury()
    }

    /// Paginated audit log of this wallet.
    pub fn events(&self, filter: &EventFilter, pagination: Pagination) -> Result<EventQueryResult, ServiceError> {
        tracing::debug!(wallet_id = %self.wallet_id, ?filter, ?pagination, "querying audit log");
        Ok(query_events(&self.store, self.wallet_id, filter, pagination)?)
    }

    /// Live feed of events committed from now on.
    pub fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.bus.subscribe()
    }

    fn read<T>(&self, f: impl FnOnce(&MultisigWallet<L>) -> T) -> Result<T, ServiceError> {
        let live = self.live.lock().map_err(|_| ServiceError::Poisoned)?;
        Ok(f(&live.wallet))
    }

    /// Run `op` on a draft and commit whatever it recorded.
    ///
    /// A ledger failure during execution still records the execution, so the
    /// draft is committed before the operation's error is returned.
    fn transact<T>(
        &self,
        op: impl FnOnce(&mut MultisigWallet<L>) -> Result<T, ApprovalError>,
    ) -> Result<T, ServiceError> {
        let mut live = self.live.lock().map_err(|_| ServiceError::Poisoned)?;

        let mut draft = live.wallet.clone();
        let outcome = op(&mut draft);
        let events = draft.take_uncommitted();

        if events.is_empty() {
            if let Err(err) = &outcome {
                tracing::warn!(wallet_id = %self.wallet_id, error = %err, "operation rejected");
            }
            return Ok(outcome?);
        }

        let committed = self.persist(self.wallet_id, &events, live.version)?;
        live.version = stream_version(&committed);
        live.wallet = draft;

        // Still under the lock so bus order matches stream order.
        let published = self.publish(&committed);
        drop(live);

        match outcome {
            Ok(value) => {
                published?;
                Ok(value)
            }
            // The ledger error takes precedence; the events are committed either way.
            Err(err) => {
                if let Err(publish) = published {
                    tracing::warn!(wallet_id = %self.wallet_id, error = %publish, "event publication failed");
                }
                tracing::warn!(wallet_id = %self.wallet_id, error = %err, "execution failed; proposal stays executed");
                Err(err.into())
            }
        }
    }

    fn persist(
        &self,
        wallet_id: WalletId,
        events: &[WalletEvent],
        expected: u64,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        let uncommitted = events
            .iter()
            .map(|ev| UncommittedEvent::from_typed(wallet_id, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self
            .store
            .append(uncommitted, ExpectedVersion::Exact(expected))?;

        tracing::debug!(
            wallet_id = %wallet_id,
            events = committed.len(),
            version = stream_version(&committed),
            "appended events"
        );
        Ok(committed)
    }

    fn publish(&self, committed: &[StoredEvent]) -> Result<(), ServiceError> {
        for stored in committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| ServiceError::Publish(e.to_string()))?;
        }
        Ok(())
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(wallet_id: WalletId, stream: &[StoredEvent]) -> Result<(), ServiceError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.wallet_id != wallet_id {
            return Err(EventStoreError::Corrupt(format!(
                "loaded stream contains wrong wallet_id at index {idx}"
            ))
            .into());
        }
        if e.sequence_number != last + 1 {
            return Err(EventStoreError::Corrupt(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))
            .into());
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn decode_history(history: &[StoredEvent]) -> Result<Vec<WalletEvent>, ServiceError> {
    history
        .iter()
        .map(|stored| {
            serde_json::from_value(stored.payload.clone()).map_err(|e| ServiceError::Decode {
                sequence_number: stored.sequence_number,
                reason: e.to_string(),
            })
        })
        .collect()
}
