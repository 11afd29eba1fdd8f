use axum::{Router, routing::get};

pub mod events;
pub mod ledger;
pub mod proposals;
pub mod system;

/// Router for all wallet endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/approvers", get(system::approvers))
        .route("/supply", get(ledger::supply))
        .route("/balances/:account", get(ledger::balance))
        .nest("/proposals", proposals::router())
        .nest("/events", events::router())
}
