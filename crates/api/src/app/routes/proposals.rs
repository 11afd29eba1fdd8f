use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use quorumtoken_core::{AccountId, ProposalId};

use crate::app::{dto, errors, services::AppServices};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_proposals).post(create_proposal))
        .route("/:id", get(get_proposal))
        .route("/:id/confirm", post(confirm_proposal))
        .route("/:id/execute", post(execute_proposal))
        .route("/:id/revoke", post(revoke_confirmation))
        .route("/:id/confirmations/:approver", get(has_confirmed))
}

fn proposal_id(raw: &str) -> Result<ProposalId, axum::response::Response> {
    errors::parse_path(raw, "proposal id")
}

pub async fn list_proposals(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.wallet().proposals() {
        Ok(proposals) => {
            let items: Vec<dto::ProposalView> = proposals.iter().map(Into::into).collect();
            let body = dto::ProposalList {
                count: items.len(),
                items,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ProposeRequest>,
) -> axum::response::Response {
    match services.wallet().propose(caller.caller(), body.kind) {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "proposal_id": id }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match proposal_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.wallet().proposal(id) {
        Ok(p) => (StatusCode::OK, Json(dto::ProposalView::from(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /proposals/:id/confirm. Executes in the same call once quorum is reached.
pub async fn confirm_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match proposal_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.wallet().confirm(caller.caller(), id) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn execute_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match proposal_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.wallet().execute(caller.caller(), id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "executed" }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn revoke_confirmation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match proposal_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.wallet().revoke(caller.caller(), id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "revoked" }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn has_confirmed(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, approver)): Path<(String, String)>,
) -> axum::response::Response {
    let id = match proposal_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let approver: AccountId = match errors::parse_path(&approver, "approver") {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match services.wallet().has_confirmed(id, approver) {
        Ok(confirmed) => (
            StatusCode::OK,
            Json(json!({ "proposal_id": id, "approver": approver, "confirmed": confirmed })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
