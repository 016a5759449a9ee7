//! Error types for fanvote storage.

use fanvote_core::PurchaseReference;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// The wallet cannot cover a gift.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance.
        balance: i64,
        /// Gift price.
        required: i64,
    },

    /// A credit would take the balance past `i64::MAX`.
    #[error("balance overflow: balance={balance}, credit={amount}")]
    BalanceOverflow {
        /// Current balance.
        balance: i64,
        /// Rejected credit.
        amount: i64,
    },

    /// A transaction with this reference is already stored.
    #[error("duplicate reference: {reference}")]
    DuplicateReference {
        /// The reused reference.
        reference: PurchaseReference,
    },
}
