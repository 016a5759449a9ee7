//! Purchase flow errors and the text shown to fans.

use fanvote_core::{PurchaseReference, TransactionId};

use crate::backend::BackendError;

/// Errors that end a vote or gift purchase.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// The session has no signed-in user.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The handler is already running a purchase.
    #[error("a purchase is already in progress")]
    AlreadyProcessing,

    /// The package is inactive or empty.
    #[error("package unavailable: {package_id}")]
    PackageUnavailable {
        /// The rejected package.
        package_id: String,
    },

    /// The package catalog could not be read. Nothing was written.
    #[error("package catalog unavailable: {0}")]
    CatalogUnavailable(#[source] BackendError),

    /// The wallet could not be read. Nothing was written.
    #[error("balance unavailable: {0}")]
    BalanceUnavailable(#[source] BackendError),

    /// The wallet cannot cover the price. Nothing was written.
    #[error("insufficient balance: balance={balance:?}, required={required}")]
    InsufficientBalance {
        /// The balance read, when the flow read one.
        balance: Option<i64>,
        /// The price of the purchase.
        required: i64,
    },

    /// The transaction insert failed. Nothing was written.
    #[error("failed to record transaction: {0}")]
    RecordingFailed(#[source] BackendError),

    /// The transaction was recorded but the wallet was never charged.
    #[error("transaction {reference} recorded but the debit failed: {source}")]
    DebitFailed {
        /// Reference of the recorded transaction.
        reference: PurchaseReference,
        /// ID of the recorded transaction.
        transaction_id: TransactionId,
        /// Why the debit failed.
        #[source]
        source: BackendError,
    },

    /// The gift procedure failed for a reason other than the balance.
    #[error("gift failed: {0}")]
    GiftFailed(#[source] BackendError),
}

impl PurchaseError {
    /// The message shown to the fan.
    ///
    /// A failed debit reads the same as a failed insert: the fan is not told
    /// the transaction was kept.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Please sign in to continue.",
            Self::AlreadyProcessing => "Your purchase is still being processed.",
            Self::PackageUnavailable { .. } => "This package is no longer available.",
            Self::CatalogUnavailable(_) => "Could not load vote packages. Please try again.",
            Self::BalanceUnavailable(_) => "Could not load your wallet. Please try again.",
            Self::InsufficientBalance { .. } => {
                "Insufficient balance. Please top up your wallet and try again."
            }
            Self::RecordingFailed(_) | Self::DebitFailed { .. } => {
                "Failed to process your vote. Please try again."
            }
            Self::GiftFailed(_) => "Failed to send gift. Please try again.",
        }
    }

    /// Whether the ledger and the wallet disagree after this error.
    #[must_use]
    pub fn leaves_ledger_inconsistent(&self) -> bool {
        matches!(self, Self::DebitFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_failure_is_not_distinguished_for_fans() {
        let recording = PurchaseError::RecordingFailed(BackendError::Unavailable("down".into()));
        let debit = PurchaseError::DebitFailed {
            reference: PurchaseReference::new("VOTE-1-A"),
            transaction_id: TransactionId::generate(),
            source: BackendError::Unavailable("down".into()),
        };

        assert_eq!(recording.user_message(), debit.user_message());
        assert!(debit.leaves_ledger_inconsistent());
        assert!(!recording.leaves_ledger_inconsistent());
    }

    #[test]
    fn insufficient_balance_message() {
        let err = PurchaseError::InsufficientBalance {
            balance: Some(10),
            required: 100,
        };
        assert!(err.user_message().starts_with("Insufficient balance"));
        assert_eq!(
            err.to_string(),
            "insufficient balance: balance=Some(10), required=100"
        );
    }
}
