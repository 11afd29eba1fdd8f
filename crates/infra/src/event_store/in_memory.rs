use std::collections::HashMap;
use std::sync::RwLock;

use quorumtoken_core::{ExpectedVersion, WalletId};

use super::r#trait::{
    EventStore, EventStoreError, StoredEvent, UncommittedEvent, current_version, sequence_batch,
};

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<WalletId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(wallet_id) = events.first().map(|e| e.wallet_id) else {
            return Ok(vec![]);
        };

        let mut streams = self.streams.write().map_err(|_| EventStoreError::Poisoned)?;

        let stream = streams.entry(wallet_id).or_default();
        let committed = sequence_batch(events, expected_version, current_version(stream))?;
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(&self, wallet_id: WalletId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams.get(&wallet_id).cloned().unwrap_or_default())
    }
}
