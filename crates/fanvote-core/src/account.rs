//! Wallet types for fanvote.
//!
//! A wallet holds a fan's spendable balance. It is read before every vote
//! purchase and overwritten by the debit that follows a recorded transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A fan's spendable balance.
///
/// `balance` is intended to stay non-negative, but nothing in the vote
/// purchase path enforces it: the pre-check and the debit are separate calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// The owning user.
    pub user_id: UserId,

    /// Current balance in minor currency units.
    pub balance: i64,

    /// When the balance was last written.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create an empty wallet.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self::with_balance(user_id, 0)
    }

    /// Create a wallet holding `balance`.
    #[must_use]
    pub fn with_balance(user_id: UserId, balance: i64) -> Self {
        Self {
            user_id,
            balance,
            updated_at: Utc::now(),
        }
    }

    /// Check if the wallet can cover `amount`.
    #[must_use]
    pub fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Overwrite the balance and bump `updated_at`.
    pub fn set_balance(&mut self, balance: i64) {
        self.balance = balance;
        self.updated_at = Utc::now();
    }
}
