//! Purchase transaction types for fanvote.
//!
//! A purchase transaction is the immutable ledger record of one vote-package
//! or gift purchase. It is created once per purchase attempt and never
//! deleted or corrected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::{CandidateId, GiftType, PurchaseReference, TransactionId, UserId, VotePackage};

/// Price of a single unit, `round(total / units)` with halves rounded up.
///
/// Returns 0 when `units` is not positive.
#[must_use]
pub fn rounded_unit_price(total: i64, units: i64) -> i64 {
    if units <= 0 {
        return 0;
    }
    (2 * total + units) / (2 * units)
}

/// A recorded vote or gift purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The purchasing fan.
    pub user_id: UserId,

    /// The candidate receiving the votes or gift.
    pub recipient_id: CandidateId,

    /// What was bought.
    pub kind: TransactionKind,

    /// Votes bought, or number of gifts sent.
    pub unit_count: i64,

    /// Rounded price of one unit.
    pub unit_price: i64,

    /// Amount charged for the whole purchase.
    pub total_amount: i64,

    /// Settlement status.
    pub status: TransactionStatus,

    /// Client-generated reference, unique per attempt.
    pub reference: PurchaseReference,

    /// Free-form details (package id, gift type, points).
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl PurchaseTransaction {
    /// Build the record for a vote-package purchase.
    ///
    /// The status is `Completed` from the start; there is no pending phase.
    #[must_use]
    pub fn votes(user_id: UserId, recipient_id: CandidateId, package: &VotePackage) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            recipient_id,
            kind: TransactionKind::Vote,
            unit_count: package.votes,
            unit_price: package.unit_price(),
            total_amount: package.price,
            status: TransactionStatus::Completed,
            reference: PurchaseReference::generate(TransactionKind::Vote.reference_prefix()),
            metadata: serde_json::json!({
                "package_id": package.id,
                "discount_percentage": package.discount_percentage,
            }),
            created_at: Utc::now(),
        }
    }

    /// Build the record for a single gift.
    #[must_use]
    pub fn gift(
        user_id: UserId,
        recipient_id: CandidateId,
        gift: &GiftType,
        reference: PurchaseReference,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            recipient_id,
            kind: TransactionKind::Gift,
            unit_count: 1,
            unit_price: gift.price,
            total_amount: gift.price,
            status: TransactionStatus::Completed,
            reference,
            metadata: serde_json::json!({
                "gift_type": gift.id,
                "gift_name": gift.name,
                "points": gift.points,
            }),
            created_at: Utc::now(),
        }
    }

    /// Check the record is internally consistent before it is stored.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidTransaction` if the counts or amounts are
    /// out of range, or the unit price does not match the total.
    pub fn validate(&self) -> Result<()> {
        if self.unit_count <= 0 {
            return Err(LedgerError::InvalidTransaction(
                "unit_count must be positive".into(),
            ));
        }
        if self.total_amount < 0 {
            return Err(LedgerError::InvalidTransaction(
                "total_amount must not be negative".into(),
            ));
        }
        if self.reference.as_str().is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "reference must not be empty".into(),
            ));
        }
        let expected = rounded_unit_price(self.total_amount, self.unit_count);
        if self.unit_price != expected {
            return Err(LedgerError::InvalidTransaction(format!(
                "unit_price {} does not match total {} over {} units (expected {expected})",
                self.unit_price, self.total_amount, self.unit_count
            )));
        }
        Ok(())
    }

    /// Points this transaction contributes to aggregates.
    ///
    /// Votes count one point each; gifts carry their points in metadata.
    #[must_use]
    pub fn points(&self) -> i64 {
        match self.kind {
            TransactionKind::Vote => self.unit_count,
            TransactionKind::Gift => self
                .metadata
                .get("points")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(self.unit_count),
        }
    }
}

/// Kind of purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A vote package.
    Vote,

    /// A gift.
    Gift,
}

impl TransactionKind {
    /// Prefix used for purchase references of this kind.
    #[must_use]
    pub const fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Vote => "VOTE",
            Self::Gift => "GIFT",
        }
    }
}

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting settlement. Not produced by the purchase flows.
    Pending,

    /// Settled.
    Completed,

    /// Settlement failed. Not produced by the purchase flows.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GiftCatalog;

    #[test]
    fn vote_transaction_from_package() {
        let package = VotePackage::new("trio", 3, 1000);
        let tx = PurchaseTransaction::votes(UserId::generate(), CandidateId::generate(), &package);

        assert_eq!(tx.kind, TransactionKind::Vote);
        assert_eq!(tx.unit_count, 3);
        assert_eq!(tx.unit_price, 333);
        assert_eq!(tx.total_amount, 1000);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.reference.as_str().starts_with("VOTE-"));
        assert_eq!(tx.metadata["package_id"], "trio");
        assert_eq!(tx.points(), 3);
    }

    #[test]
    fn gift_transaction_points_from_metadata() {
        let catalog = GiftCatalog::standard();
        let crown = catalog.find("crown").unwrap();
        let tx = PurchaseTransaction::gift(
            UserId::generate(),
            CandidateId::generate(),
            crown,
            PurchaseReference::generate("GIFT"),
        );

        assert_eq!(tx.unit_count, 1);
        assert_eq!(tx.total_amount, 5000);
        assert_eq!(tx.points(), 65);
    }

    #[test]
    fn validate_rejects_tampered_unit_price() {
        let mut tx = PurchaseTransaction::votes(
            UserId::generate(),
            CandidateId::generate(),
            &VotePackage::new("trio", 3, 1000),
        );
        assert!(tx.validate().is_ok());

        tx.unit_price = 1;
        assert!(matches!(
            tx.validate(),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_reference() {
        let mut tx = PurchaseTransaction::votes(
            UserId::generate(),
            CandidateId::generate(),
            &VotePackage::new("single", 1, 100),
        );
        tx.reference = PurchaseReference::new("");
        assert!(tx.validate().is_err());
    }

    #[test]
    fn unit_price_with_no_units_is_zero() {
        assert_eq!(rounded_unit_price(1000, 0), 0);
        assert_eq!(rounded_unit_price(1000, -2), 0);
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(TransactionKind::Gift).unwrap(),
            serde_json::json!("gift")
        );
        assert_eq!(
            serde_json::to_value(TransactionStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
    }
}
