use axum::{
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use quorumtoken_core::AccountId;

use crate::app::errors;
use crate::context::CallerContext;

pub const CALLER_HEADER: &str = "x-caller-id";

/// Attach [`CallerContext`] from `x-caller-id`.
///
/// A malformed header is always rejected. A missing header is only rejected
/// on mutating requests; reads are public.
pub async fn caller_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    match extract_caller(req.headers()) {
        Ok(Some(caller)) => {
            req.extensions_mut().insert(CallerContext::new(caller));
        }
        Ok(None) if is_read(req.method()) => {}
        Ok(None) => {
            return Err(errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                format!("missing {CALLER_HEADER} header"),
            ));
        }
        Err(message) => {
            return Err(errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                message,
            ));
        }
    }

    Ok(next.run(req).await)
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn extract_caller(headers: &HeaderMap) -> Result<Option<AccountId>, String> {
    let Some(header) = headers.get(CALLER_HEADER) else {
        return Ok(None);
    };

    let value = header
        .to_str()
        .map_err(|_| format!("{CALLER_HEADER} is not valid ASCII"))?
        .trim();

    value
        .parse::<AccountId>()
        .map(Some)
        .map_err(|e| format!("{CALLER_HEADER}: {e}"))
}
