use chrono::{DateTime, Utc};

/// A recorded fact.
///
/// Events are immutable, versioned and append-only. `event_type` is a stable
/// dotted name (e.g. `"approval.proposal.confirmed"`) that consumers filter on.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    /// Schema version of this event type.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
