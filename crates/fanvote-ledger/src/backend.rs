//! The remote operations the purchase flows are built from.

use async_trait::async_trait;
use futures::stream::BoxStream;

use fanvote_core::{
    CandidateAggregate, CandidateId, ChangeEvent, FanPoints, GiftType, PurchaseReference,
    PurchaseTransaction, TransactionId, UserId, VotePackage, Wallet,
};

/// A stream of row changes. Dropping it ends the subscription.
pub type ChangeStream = BoxStream<'static, ChangeEvent>;

/// Errors reported by a ledger backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached or failed internally.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the request.
    #[error("rejected ({status}): {code} - {message}")]
    Rejected {
        /// HTTP-style status code.
        status: u16,
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The gift procedure reported a failure.
    #[error("procedure failed: {message}")]
    Procedure {
        /// The procedure's error text.
        message: String,
    },

    /// The backend answered with something that could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Which row changes a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionFilter {
    /// One candidate row, by primary key.
    Candidate(CandidateId),

    /// Every candidate row; consumers filter client-side.
    AllCandidates,

    /// One fan's points row.
    Fan(UserId),
}

impl SubscriptionFilter {
    /// Check whether `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match (self, event) {
            (Self::Candidate(id), ChangeEvent::Candidate(row)) => row.candidate_id == *id,
            (Self::AllCandidates, ChangeEvent::Candidate(_)) => true,
            (Self::Fan(id), ChangeEvent::Fan(row)) => row.user_id == *id,
            _ => false,
        }
    }
}

/// Outcome of a successful gift procedure call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GiftReceipt {
    /// The recorded transaction.
    pub transaction_id: TransactionId,

    /// Reference generated for the gift.
    pub reference: PurchaseReference,

    /// Wallet balance after the debit.
    pub balance_after: i64,
}

/// The managed backend the purchase flows talk to.
///
/// Implementations are opaque: the flows rely only on what each call returns,
/// never on transactional guarantees across calls.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Point read of a fan's wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet cannot be read.
    async fn read_balance(&self, user_id: &UserId) -> Result<Wallet, BackendError>;

    /// Append a transaction record. `record.reference` must not have been used before.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is rejected or cannot be written.
    async fn insert_transaction(
        &self,
        record: &PurchaseTransaction,
    ) -> Result<TransactionId, BackendError>;

    /// Overwrite a fan's balance. Not a conditional decrement.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn update_balance(&self, user_id: &UserId, new_balance: i64) -> Result<(), BackendError>;

    /// Send a gift through the backend's atomic procedure.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Procedure` carrying the procedure's error text,
    /// which mentions an insufficient balance when that is the cause.
    async fn call_gift_procedure(
        &self,
        user_id: &UserId,
        candidate_id: &CandidateId,
        gift_type: &str,
    ) -> Result<GiftReceipt, BackendError>;

    /// Subscribe to row changes matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    async fn subscribe(&self, filter: SubscriptionFilter) -> Result<ChangeStream, BackendError>;

    /// Read a candidate's current totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read.
    async fn read_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<CandidateAggregate, BackendError>;

    /// Read a fan's current points.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read.
    async fn read_fan_points(&self, user_id: &UserId) -> Result<FanPoints, BackendError>;

    /// List the vote package catalog, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    async fn list_vote_packages(&self) -> Result<Vec<VotePackage>, BackendError>;

    /// List the gift catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    async fn list_gift_types(&self) -> Result<Vec<GiftType>, BackendError>;
}
