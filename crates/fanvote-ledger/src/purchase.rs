//! Vote and gift purchase flows.

use std::sync::Arc;

use fanvote_core::{
    CandidateId, GiftType, PurchaseReference, PurchaseTransaction, TransactionId, UserId,
    VotePackage,
};

use crate::backend::{BackendError, GiftReceipt, LedgerBackend};
use crate::error::PurchaseError;

/// The signed-in state of the fan making a purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
}

impl Session {
    /// A session for a signed-in fan.
    #[must_use]
    pub const fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// A session with nobody signed in.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// The signed-in fan, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

/// Outcome of a successful vote purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    /// The recorded transaction.
    pub transaction_id: TransactionId,
    /// Reference generated for the purchase.
    pub reference: PurchaseReference,
    /// Votes bought.
    pub votes: i64,
    /// Amount charged.
    pub amount: i64,
    /// Balance written by the debit.
    pub balance_after: i64,
}

/// Purchase flows over a ledger backend.
pub struct Ledger<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for Ledger<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: LedgerBackend + ?Sized> Ledger<B> {
    /// Create a ledger over `backend`.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// The backend this ledger talks to.
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Active vote packages in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub async fn active_packages(&self) -> Result<Vec<VotePackage>, BackendError> {
        let mut packages: Vec<VotePackage> = self
            .backend
            .list_vote_packages()
            .await?
            .into_iter()
            .filter(|p| p.is_active)
            .collect();
        packages.sort_by_key(|p| p.sort_order);
        Ok(packages)
    }

    /// The gift catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub async fn gift_types(&self) -> Result<Vec<GiftType>, BackendError> {
        self.backend.list_gift_types().await
    }

    /// Buy a vote package for a candidate.
    ///
    /// Reads the balance, records a completed transaction, then overwrites
    /// the balance with `balance - price`. The three calls are independent:
    /// a concurrent purchase can pass the same balance check, and a failed
    /// debit leaves the recorded transaction in place.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated`, `PackageUnavailable`, `CatalogUnavailable`,
    ///   `BalanceUnavailable`, `InsufficientBalance`, `RecordingFailed`:
    ///   nothing was written.
    /// - `DebitFailed`: the transaction exists but the wallet was not charged.
    pub async fn purchase_votes(
        &self,
        session: &Session,
        candidate_id: CandidateId,
        package: &VotePackage,
    ) -> Result<VoteReceipt, PurchaseError> {
        let user_id = session.user_id().ok_or(PurchaseError::NotAuthenticated)?;

        if !package.is_purchasable() {
            return Err(PurchaseError::PackageUnavailable {
                package_id: package.id.clone(),
            });
        }

        // Only a package the catalog currently offers, at its listed terms.
        let catalog = self.active_packages().await.map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to read vote packages");
            PurchaseError::CatalogUnavailable(e)
        })?;
        let package = catalog
            .into_iter()
            .find(|listed| {
                listed.id == package.id
                    && listed.votes == package.votes
                    && listed.price == package.price
            })
            .ok_or_else(|| {
                tracing::info!(
                    user_id = %user_id,
                    package_id = %package.id,
                    "Vote purchase rejected: package not in the active catalog"
                );
                PurchaseError::PackageUnavailable {
                    package_id: package.id.clone(),
                }
            })?;

        let wallet = self.backend.read_balance(&user_id).await.map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to read wallet balance");
            PurchaseError::BalanceUnavailable(e)
        })?;

        if !wallet.has_sufficient_balance(package.price) {
            tracing::info!(
                user_id = %user_id,
                balance = wallet.balance,
                required = package.price,
                "Vote purchase rejected: insufficient balance"
            );
            return Err(PurchaseError::InsufficientBalance {
                balance: Some(wallet.balance),
                required: package.price,
            });
        }

        let record = PurchaseTransaction::votes(user_id, candidate_id, &package);

        let transaction_id = self
            .backend
            .insert_transaction(&record)
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %user_id,
                    reference = %record.reference,
                    error = %e,
                    "Failed to record vote transaction"
                );
                PurchaseError::RecordingFailed(e)
            })?;

        let balance_after = wallet.balance - package.price;

        if let Err(e) = self.backend.update_balance(&user_id, balance_after).await {
            tracing::error!(
                user_id = %user_id,
                transaction_id = %transaction_id,
                reference = %record.reference,
                amount = package.price,
                error = %e,
                "Vote recorded but wallet debit failed; ledger and balance disagree"
            );
            return Err(PurchaseError::DebitFailed {
                reference: record.reference,
                transaction_id,
                source: e,
            });
        }

        tracing::info!(
            user_id = %user_id,
            candidate_id = %candidate_id,
            transaction_id = %transaction_id,
            votes = package.votes,
            amount = package.price,
            balance_after,
            "Votes purchased"
        );

        Ok(VoteReceipt {
            transaction_id,
            reference: record.reference,
            votes: package.votes,
            amount: package.price,
            balance_after,
        })
    }

    /// Send a gift to a candidate through the backend's atomic procedure.
    ///
    /// No local balance check is made; the procedure checks, debits and
    /// records in one step.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` if nobody is signed in.
    /// - `InsufficientBalance` if the procedure's error text says so.
    /// - `GiftFailed` for every other failure.
    pub async fn purchase_gift(
        &self,
        session: &Session,
        candidate_id: CandidateId,
        gift: &GiftType,
    ) -> Result<GiftReceipt, PurchaseError> {
        let user_id = session.user_id().ok_or(PurchaseError::NotAuthenticated)?;

        let receipt = self
            .backend
            .call_gift_procedure(&user_id, &candidate_id, &gift.id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %user_id,
                    candidate_id = %candidate_id,
                    gift_type = %gift.id,
                    error = %e,
                    "Gift procedure failed"
                );
                classify_gift_failure(e, gift)
            })?;

        tracing::info!(
            user_id = %user_id,
            candidate_id = %candidate_id,
            gift_type = %gift.id,
            transaction_id = %receipt.transaction_id,
            balance_after = receipt.balance_after,
            "Gift sent"
        );

        Ok(receipt)
    }
}

fn classify_gift_failure(error: BackendError, gift: &GiftType) -> PurchaseError {
    if mentions_insufficient_balance(&error.to_string()) {
        return PurchaseError::InsufficientBalance {
            balance: None,
            required: gift.price,
        };
    }

    PurchaseError::GiftFailed(error)
}

/// Whether an error text reports an insufficient balance.
///
/// Matches `insufficient_balance`, `Insufficient balance` and similar.
fn mentions_insufficient_balance(message: &str) -> bool {
    message
        .to_lowercase()
        .replace('_', " ")
        .contains("insufficient balance")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_text_variants() {
        assert!(mentions_insufficient_balance(
            "procedure failed: insufficient_balance"
        ));
        assert!(mentions_insufficient_balance("Insufficient balance for gift"));
        assert!(!mentions_insufficient_balance("candidate not found"));
    }

    #[test]
    fn gift_failures_are_classified() {
        let rose = GiftType {
            id: "rose".into(),
            name: "Rose".into(),
            price: 100,
            points: 1,
        };

        assert!(matches!(
            classify_gift_failure(
                BackendError::Procedure {
                    message: "INSUFFICIENT_BALANCE".into()
                },
                &rose
            ),
            PurchaseError::InsufficientBalance {
                balance: None,
                required: 100
            }
        ));
        assert!(matches!(
            classify_gift_failure(BackendError::NotFound("wallet".into()), &rose),
            PurchaseError::GiftFailed(BackendError::NotFound(_))
        ));
        assert!(matches!(
            classify_gift_failure(BackendError::Unavailable("timeout".into()), &rose),
            PurchaseError::GiftFailed(_)
        ));
    }

    #[test]
    fn anonymous_session_has_no_user() {
        assert_eq!(Session::anonymous().user_id(), None);
        assert_eq!(Session::default(), Session::anonymous());
    }
}
