//! Transaction handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use fanvote_core::{PurchaseTransaction, TransactionId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Insert response.
#[derive(Debug, Serialize, Deserialize)]
pub struct InsertTransactionResponse {
    /// ID of the stored transaction.
    pub id: TransactionId,
}

/// Record a purchase transaction.
///
/// The aggregate trigger runs in the same store write, and the new candidate
/// and fan rows are pushed to realtime subscribers.
pub async fn insert_transaction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(record): Json<PurchaseTransaction>,
) -> Result<(StatusCode, Json<InsertTransactionResponse>), ApiError> {
    auth.require_owner(&record.user_id)?;
    record
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let commit = state.store.insert_transaction(&record)?;
    state.notifier.publish(&commit);

    tracing::info!(
        user_id = %record.user_id,
        transaction_id = %record.id,
        reference = %record.reference,
        kind = ?record.kind,
        amount = record.total_amount,
        "Transaction recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(InsertTransactionResponse { id: record.id }),
    ))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<PurchaseTransaction>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List the caller's transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let mut transactions =
        state
            .store
            .list_transactions_by_user(&auth.user_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    transactions.truncate(limit);

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}
