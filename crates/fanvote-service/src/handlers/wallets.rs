//! Wallet handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use fanvote_core::{UserId, Wallet};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Get a fan's wallet.
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<Wallet>, ApiError> {
    auth.require_owner(&user_id)?;

    let wallet = state
        .store
        .get_wallet(&user_id)?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".into()))?;

    Ok(Json(wallet))
}

/// Balance overwrite request.
#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    /// The new balance. Written as-is.
    pub balance: i64,
}

/// Overwrite a fan's balance.
pub async fn update_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
    Json(body): Json<UpdateBalanceRequest>,
) -> Result<Json<Wallet>, ApiError> {
    auth.require_owner(&user_id)?;

    let wallet = state.store.set_balance(&user_id, body.balance)?;

    tracing::info!(user_id = %user_id, balance = wallet.balance, "Wallet balance written");

    Ok(Json(wallet))
}
