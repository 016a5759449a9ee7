//! Request and response bodies for the fanvote API.

use serde::{Deserialize, Serialize};

use fanvote_core::{FanPoints, TransactionId};

/// Body of `PUT /v1/wallets/:user_id`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateBalanceRequest {
    /// The new balance.
    pub balance: i64,
}

/// Response of `POST /v1/transactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertTransactionResponse {
    /// ID of the stored transaction.
    pub id: TransactionId,
}

/// Body of `POST /v1/rpc/send_gift`.
#[derive(Debug, Clone, Serialize)]
pub struct SendGiftRequest<'a> {
    /// The receiving candidate.
    pub candidate_id: fanvote_core::CandidateId,
    /// Gift type ID from the catalog.
    pub gift_type: &'a str,
}

/// Response of `GET /v1/fans/:user_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct FanStanding {
    /// The points row.
    #[serde(flatten)]
    pub points: FanPoints,
    /// 1-based rank by points.
    pub rank: usize,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
