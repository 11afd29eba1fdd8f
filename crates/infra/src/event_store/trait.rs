use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use quorumtoken_core::{ExpectedVersion, WalletId};

/// An event ready to be appended to a wallet stream (no sequence number yet).
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`],
/// which serializes the payload and captures the metadata consumers filter
/// on (`event_type`, `event_version`, `occurred_at`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub wallet_id: WalletId,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A persisted event with its position in the wallet stream.
///
/// Sequence numbers start at 1, increase by one per event, and never change
/// once assigned. The stream version is the sequence number of the last
/// event (0 for an empty stream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub wallet_id: WalletId,

    /// Monotonically increasing position in the wallet stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Copy into an envelope for publication on the bus.
    pub fn to_envelope(&self) -> quorumtoken_events::EventEnvelope<JsonValue> {
        quorumtoken_events::EventEnvelope::new(
            self.event_id,
            self.wallet_id,
            self.sequence_number,
            self.event_type.clone(),
            self.occurred_at,
            self.payload.clone(),
        )
    }

    /// Proposal id carried by the payload, if the event concerns a proposal.
    pub fn proposal_id(&self) -> Option<u64> {
        fn find(value: &JsonValue) -> Option<u64> {
            match value {
                JsonValue::Object(map) => map
                    .get("proposal_id")
                    .and_then(JsonValue::as_u64)
                    .or_else(|| map.values().find_map(find)),
                _ => None,
            }
        }
        find(&self.payload)
    }
}

/// Infrastructure failures of the event store. Domain rejections never
/// reach this type.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("corrupt event log: {0}")]
    Corrupt(String),

    #[error("event log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned")]
    Poisoned,
}

/// Append-only store of wallet event streams.
///
/// One stream per [`WalletId`]. `append` is all or nothing: it checks
/// `expected_version` against the current stream version, assigns sequence
/// numbers starting at `current + 1`, and persists the whole batch or none of
/// it. `load_stream` returns the stream in sequence order, empty if the wallet
/// was never created.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(&self, wallet_id: WalletId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, wallet_id: WalletId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(wallet_id)
    }
}

impl UncommittedEvent {
    pub fn from_typed<E>(wallet_id: WalletId, event_id: Uuid, event: &E) -> Result<Self, EventStoreError>
    where
        E: quorumtoken_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            wallet_id,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// Validate a batch and stamp it with sequence numbers after `current`.
///
/// Shared by every backend so they agree on batch rules.
pub(crate) fn sequence_batch(
    events: Vec<UncommittedEvent>,
    expected_version: ExpectedVersion,
    current: u64,
) -> Result<Vec<StoredEvent>, EventStoreError> {
    let Some(first) = events.first() else {
        return Ok(Vec::new());
    };
    let wallet_id = first.wallet_id;

    if let Some(idx) = events.iter().position(|e| e.wallet_id != wallet_id) {
        return Err(EventStoreError::InvalidAppend(format!(
            "batch contains multiple wallet_ids (index {idx})"
        )));
    }

    if !expected_version.matches(current) {
        return Err(EventStoreError::Concurrency(format!(
            "expected {expected_version:?}, found {current}"
        )));
    }

    Ok(events
        .into_iter()
        .zip(current + 1..)
        .map(|(e, sequence_number)| StoredEvent {
            event_id: e.event_id,
            wallet_id: e.wallet_id,
            sequence_number,
            event_type: e.event_type,
            event_version: e.event_version,
            occurred_at: e.occurred_at,
            payload: e.payload,
        })
        .collect())
}

pub(crate) fn current_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}
