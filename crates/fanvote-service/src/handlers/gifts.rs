//! Gift procedure handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use fanvote_core::CandidateId;
use fanvote_ledger::GiftReceipt;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// `send_gift` arguments.
#[derive(Debug, Deserialize)]
pub struct SendGiftRequest {
    /// The receiving candidate.
    pub candidate_id: CandidateId,
    /// Gift type ID from the catalog.
    pub gift_type: String,
}

/// Send a gift: check, debit, record and update counters in one store write.
pub async fn send_gift(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SendGiftRequest>,
) -> Result<Json<GiftReceipt>, ApiError> {
    let gift = state
        .gifts
        .find(&body.gift_type)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown gift type: {}", body.gift_type)))?;

    let result = state
        .store
        .send_gift(&auth.user_id, &body.candidate_id, gift)?;
    state.notifier.publish(&result.commit);

    tracing::info!(
        user_id = %auth.user_id,
        candidate_id = %body.candidate_id,
        gift_type = %gift.id,
        transaction_id = %result.commit.transaction.id,
        balance_after = result.balance_after,
        "Gift sent"
    );

    Ok(Json(GiftReceipt {
        transaction_id: result.commit.transaction.id,
        reference: result.commit.transaction.reference,
        balance_after: result.balance_after,
    }))
}
