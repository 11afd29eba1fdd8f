use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use quorumtoken_approval::ApprovalError;
use quorumtoken_infra::ServiceError;
use quorumtoken_ledger::LedgerError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Approval(e) => approval_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "event store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Decode { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "decode_error", err.to_string())
        }
        ServiceError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
        ServiceError::Poisoned => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
        }
    }
}

fn approval_error_to_response(err: ApprovalError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        ApprovalError::NotAuthorized(_) => json_error(StatusCode::FORBIDDEN, "not_authorized", message),
        ApprovalError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        ApprovalError::AlreadyExecuted(_) => {
            json_error(StatusCode::CONFLICT, "already_executed", message)
        }
        ApprovalError::AlreadyConfirmed { .. } => {
            json_error(StatusCode::CONFLICT, "already_confirmed", message)
        }
        ApprovalError::NotConfirmed { .. } => json_error(StatusCode::CONFLICT, "not_confirmed", message),
        ApprovalError::QuorumNotMet { .. } => json_error(StatusCode::CONFLICT, "quorum_not_met", message),
        ApprovalError::Ledger(LedgerError::InsufficientBalance { .. }) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance", message)
        }
        ApprovalError::Ledger(LedgerError::SupplyOverflow) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "supply_overflow", message)
        }
        ApprovalError::Config(_) => json_error(StatusCode::BAD_REQUEST, "invalid_config", message),
        ApprovalError::InvalidHistory(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "invalid_history", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path segment, mapping failure to 400.
pub fn parse_path<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_path", format!("{what}: {e}")))
}
