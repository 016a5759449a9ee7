//! Denormalized counters derived from the ledger.
//!
//! The backend folds every inserted transaction into the recipient's
//! `CandidateAggregate` and the sender's `FanPoints`, then publishes the new
//! rows as `ChangeEvent`s. Observers replace their copy wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CandidateId, PurchaseTransaction, TransactionKind, UserId};

/// Per-candidate totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAggregate {
    /// The candidate.
    pub candidate_id: CandidateId,

    /// Votes received.
    pub votes: i64,

    /// Gifts received.
    pub gifts: i64,

    /// Summed price of gifts received.
    pub gift_worth: i64,

    /// Points from votes and gifts.
    pub points: i64,

    /// When the row was last recomputed.
    pub updated_at: DateTime<Utc>,
}

impl CandidateAggregate {
    /// A candidate with no activity.
    #[must_use]
    pub fn empty(candidate_id: CandidateId) -> Self {
        Self {
            candidate_id,
            votes: 0,
            gifts: 0,
            gift_worth: 0,
            points: 0,
            updated_at: Utc::now(),
        }
    }

    /// Fold one transaction into the totals.
    ///
    /// Transactions for other candidates are ignored.
    pub fn apply(&mut self, tx: &PurchaseTransaction) {
        if tx.recipient_id != self.candidate_id {
            return;
        }

        match tx.kind {
            TransactionKind::Vote => self.votes += tx.unit_count,
            TransactionKind::Gift => {
                self.gifts += tx.unit_count;
                self.gift_worth += tx.total_amount;
            }
        }
        self.points += tx.points();
        self.updated_at = Utc::now();
    }

    /// Recompute the totals for `candidate_id` from scratch.
    #[must_use]
    pub fn from_transactions<'a>(
        candidate_id: CandidateId,
        transactions: impl IntoIterator<Item = &'a PurchaseTransaction>,
    ) -> Self {
        let mut aggregate = Self::empty(candidate_id);
        for tx in transactions {
            aggregate.apply(tx);
        }
        aggregate
    }
}

/// A fan's own standing, shown on the fan dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanPoints {
    /// The fan.
    pub user_id: UserId,

    /// Points earned by voting and gifting.
    pub points: i64,

    /// Votes bought.
    pub votes_cast: i64,

    /// Gifts sent.
    pub gifts_sent: i64,

    /// Total charged across all purchases.
    pub amount_spent: i64,

    /// When the row was last recomputed.
    pub updated_at: DateTime<Utc>,
}

impl FanPoints {
    /// A fan with no activity.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            points: 0,
            votes_cast: 0,
            gifts_sent: 0,
            amount_spent: 0,
            updated_at: Utc::now(),
        }
    }

    /// Fold one transaction into the totals.
    ///
    /// Transactions by other fans are ignored.
    pub fn apply(&mut self, tx: &PurchaseTransaction) {
        if tx.user_id != self.user_id {
            return;
        }

        match tx.kind {
            TransactionKind::Vote => self.votes_cast += tx.unit_count,
            TransactionKind::Gift => self.gifts_sent += tx.unit_count,
        }
        self.points += tx.points();
        self.amount_spent += tx.total_amount;
        self.updated_at = Utc::now();
    }
}

/// Rank of a fan among all fans: one more than the number with strictly more points.
#[must_use]
pub fn rank_of<'a>(points: i64, all: impl IntoIterator<Item = &'a FanPoints>) -> usize {
    1 + all.into_iter().filter(|f| f.points > points).count()
}

/// A row change pushed to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// New state of a candidate row.
    Candidate(CandidateAggregate),

    /// New state of a fan row.
    Fan(FanPoints),
}
