//! Audit events and their distribution.
//!
//! - [`Event`]: the facts emitted by the ledger and the approval engine
//! - [`EventEnvelope`]: a committed event plus its stream position
//! - [`EventBus`]: pub/sub fan-out to external consumers (explorers, monitors)

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{BusError, InMemoryEventBus};
