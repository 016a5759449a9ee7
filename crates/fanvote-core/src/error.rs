//! Error types for fanvote domain validation.

/// Result type for fanvote domain operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised while validating ledger records and catalog lookups.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A transaction record is malformed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The gift type is not in the catalog.
    #[error("unknown gift type: {gift_type}")]
    UnknownGift {
        /// The requested gift type.
        gift_type: String,
    },
}
