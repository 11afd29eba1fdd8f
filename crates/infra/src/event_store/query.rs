//! Audit log queries for inspection and explorers.
//!
//! Read-only and paginated by default. Events come back in stream order.

use serde::{Deserialize, Serialize};

use quorumtoken_core::{ProposalId, WalletId};

use crate::event_store::{EventStore, EventStoreError, StoredEvent};

/// Pagination parameters for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Filter criteria for event queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Event type prefix, e.g. `"ledger."` or `"approval.proposal.confirmed"`.
    pub event_type: Option<String>,
    /// Only events about this proposal.
    pub proposal_id: Option<ProposalId>,
}

impl EventFilter {
    pub fn matches(&self, event: &StoredEvent) -> bool {
        let type_ok = self
            .event_type
            .as_deref()
            .is_none_or(|prefix| event.event_type.starts_with(prefix));
        let proposal_ok = self
            .proposal_id
            .is_none_or(|id| event.proposal_id() == Some(id.value()));
        type_ok && proposal_ok
    }
}

/// Paginated event query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    pub events: Vec<StoredEvent>,
    /// Total number of events matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Filter and page one wallet's stream.
pub fn query_events<S>(
    store: &S,
    wallet_id: WalletId,
    filter: &EventFilter,
    pagination: Pagination,
) -> Result<EventQueryResult, EventStoreError>
where
    S: EventStore + ?Sized,
{
    let matching: Vec<StoredEvent> = store
        .load_stream(wallet_id)?
        .into_iter()
        .filter(|e| filter.matches(e))
        .collect();

    let total = matching.len() as u64;
    let events: Vec<StoredEvent> = matching
        .into_iter()
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect();
    let has_more = u64::from(pagination.offset) + (events.len() as u64) < total;

    Ok(EventQueryResult {
        events,
        total,
        pagination,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{InMemoryEventStore, UncommittedEvent};
    use chrono::Utc;
    use quorumtoken_core::ExpectedVersion;
    use serde_json::{Value, json};
    use uuid::Uuid;

    fn event(wallet_id: WalletId, event_type: &str, payload: Value) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            wallet_id,
            event_type: event_type.to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload,
        }
    }

    fn seeded() -> (InMemoryEventStore, WalletId) {
        let store = InMemoryEventStore::new();
        let w = WalletId::new();
        store
            .append(
                vec![
                    event(w, "wallet.created", json!({"WalletCreated": {}})),
                    event(
                        w,
                        "approval.proposal.submitted",
                        json!({"Approval": {"ProposalSubmitted": {"proposal_id": 0}}}),
                    ),
                    event(
                        w,
                        "approval.proposal.confirmed",
                        json!({"Approval": {"ProposalConfirmed": {"proposal_id": 0}}}),
                    ),
                    event(
                        w,
                        "approval.proposal.submitted",
                        json!({"Approval": {"ProposalSubmitted": {"proposal_id": 1}}}),
                    ),
                    event(w, "ledger.minted", json!({"Ledger": {"Minted": {}}})),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        (store, w)
    }

    #[test]
    fn pagination_caps_limit() {
        assert_eq!(Pagination::new(Some(5000), None).limit, 1000);
        assert_eq!(Pagination::default(), Pagination { limit: 50, offset: 0 });
    }

    #[test]
    fn filters_by_type_prefix() {
        let (store, w) = seeded();
        let filter = EventFilter {
            event_type: Some("approval.".to_string()),
            ..Default::default()
        };

        let result = query_events(&store, w, &filter, Pagination::default()).unwrap();

        assert_eq!(result.total, 3);
        assert!(!result.has_more);
        assert!(result.events.iter().all(|e| e.event_type.starts_with("approval.")));
    }

    #[test]
    fn filters_by_proposal() {
        let (store, w) = seeded();
        let filter = EventFilter {
            proposal_id: Some(ProposalId::new(0)),
            ..Default::default()
        };

        let result = query_events(&store, w, &filter, Pagination::default()).unwrap();

        assert_eq!(
            result.events.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn pages_in_stream_order() {
        let (store, w) = seeded();
        let page = query_events(&store, w, &EventFilter::default(), Pagination::new(Some(2), Some(2)))
            .unwrap();

        assert_eq!(page.total, 5);
        assert!(page.has_more);
        assert_eq!(
            page.events.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![3, 4]
        );
    }
}
