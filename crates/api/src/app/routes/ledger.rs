use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use quorumtoken_core::AccountId;
use quorumtoken_infra::ServiceError;

use crate::app::{
    dto, errors,
    services::{ApiWalletService, AppServices},
};

/// GET /balances/:account. Unknown accounts hold zero.
pub async fn balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account): Path<String>,
) -> axum::response::Response {
    let account: AccountId = match errors::parse_path(&account, "account") {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match services.wallet().balance_of(account) {
        Ok(balance) => (StatusCode::OK, Json(dto::BalanceView { account, balance })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn supply(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match supply_view(services.wallet()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn supply_view(wallet: &ApiWalletService) -> Result<dto::SupplyView, ServiceError> {
    let treasury = wallet.treasury();
    Ok(dto::SupplyView {
        total_supply: wallet.total_supply()?,
        treasury,
        treasury_balance: wallet.balance_of(treasury)?,
        token: wallet.metadata()?,
    })
}
