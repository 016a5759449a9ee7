//! Admin handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use fanvote_core::{UserId, Wallet};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Admin wallet credit request.
#[derive(Debug, Deserialize)]
pub struct CreditWalletRequest {
    /// Amount to add.
    pub amount: i64,
    /// Reason for the credit (for audit).
    #[serde(default)]
    pub reason: String,
}

/// Add funds to a fan's wallet, creating it if needed.
pub async fn credit_wallet(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<UserId>,
    Json(body): Json<CreditWalletRequest>,
) -> Result<Json<Wallet>, ApiError> {
    if body.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }

    let wallet = state.store.credit_wallet(&user_id, body.amount)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        amount = body.amount,
        reason = %body.reason,
        new_balance = wallet.balance,
        "Wallet credited"
    );

    Ok(Json(wallet))
}
