//! Candidate and fan counter handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use fanvote_core::{CandidateAggregate, CandidateId, FanPoints, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Get a candidate's totals.
pub async fn get_candidate(
    State(state): State<Arc<AppState>>,
    Path(candidate_id): Path<CandidateId>,
) -> Result<Json<CandidateAggregate>, ApiError> {
    Ok(Json(state.store.get_candidate(&candidate_id)?))
}

/// A fan's points with their rank among all fans.
#[derive(Debug, Serialize)]
pub struct FanStanding {
    /// The points row.
    #[serde(flatten)]
    pub points: FanPoints,
    /// 1-based rank by points.
    pub rank: usize,
}

/// Get the caller's points and rank.
pub async fn get_fan(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<FanStanding>, ApiError> {
    auth.require_owner(&user_id)?;

    Ok(Json(FanStanding {
        points: state.store.get_fan_points(&user_id)?,
        rank: state.store.fan_rank(&user_id)?,
    }))
}
