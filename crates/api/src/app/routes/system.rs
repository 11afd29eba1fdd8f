use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::{dto, errors, services::AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn approvers(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.wallet().approvers() {
        Ok((approvers, quorum)) => {
            (StatusCode::OK, Json(dto::ApproversView { approvers, quorum })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
