//! Catalog handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use fanvote_core::{GiftType, VotePackage};

use crate::error::ApiError;
use crate::state::AppState;

/// List every vote package, active or not.
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VotePackage>>, ApiError> {
    Ok(Json(state.store.list_packages()?))
}

/// List the gift catalog.
pub async fn list_gifts(State(state): State<Arc<AppState>>) -> Json<Vec<GiftType>> {
    Json(state.gifts.gifts().to_vec())
}
