//! Audit log endpoints: paginated listing and a live SSE feed.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use quorumtoken_infra::event_store::{EventFilter, Pagination};

use crate::app::{dto, errors, services, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_events))
        .route("/stream", get(stream))
}

/// GET /events?event_type=ledger.&proposal_id=3&limit=50&offset=0
///
/// Events come back in stream order. `limit` defaults to 50, capped at 1000.
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::EventListQuery>,
) -> axum::response::Response {
    let filter = EventFilter {
        event_type: query.event_type,
        proposal_id: query.proposal_id,
    };
    let pagination = Pagination::new(query.limit, query.offset);

    match services.wallet().events(&filter, pagination) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /events/stream: events committed after the client connects.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>> {
    services::wallet_sse_stream(services)
}
