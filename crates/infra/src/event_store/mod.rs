//! Append-only event store boundary.
//!
//! One stream per wallet; the store is the source of truth and the bus only
//! distributes what has been committed here.

pub mod file;
pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use file::FileEventStore;
pub use in_memory::InMemoryEventStore;
pub use query::{EventFilter, EventQueryResult, Pagination, query_events};
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Either backend, picked at startup from configuration.
#[derive(Debug)]
pub enum AnyEventStore {
    Memory(InMemoryEventStore),
    File(FileEventStore),
}

impl EventStore for AnyEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: quorumtoken_core::ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        match self {
            AnyEventStore::Memory(s) => s.append(events, expected_version),
            AnyEventStore::File(s) => s.append(events, expected_version),
        }
    }

    fn load_stream(
        &self,
        wallet_id: quorumtoken_core::WalletId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        match self {
            AnyEventStore::Memory(s) => s.load_stream(wallet_id),
            AnyEventStore::File(s) => s.load_stream(wallet_id),
        }
    }
}
