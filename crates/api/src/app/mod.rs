//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (event store, bus, wallet service, SSE fan-out)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use quorumtoken_infra::{AppConfig, ServiceError};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router around already-wired services.
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let wallet_routes = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::caller_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(wallet_routes)
        .layer(ServiceBuilder::new())
}

/// Wire services from configuration and build the router (used by `main.rs`).
pub fn build_app_from_config(config: &AppConfig) -> Result<Router, ServiceError> {
    let services = Arc::new(services::build_services(config)?);
    Ok(build_app(services))
}
