//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Wallets, keyed by `user_id`.
    pub const WALLETS: &str = "wallets";

    /// Purchase transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Index: purchase reference to `transaction_id`. Enforces uniqueness.
    pub const REFERENCES: &str = "references";

    /// Candidate totals, keyed by `candidate_id`.
    pub const CANDIDATES: &str = "candidates";

    /// Fan points, keyed by `user_id`.
    pub const FANS: &str = "fans";

    /// Vote packages, keyed by package id.
    pub const PACKAGES: &str = "packages";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::WALLETS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::REFERENCES,
        cf::CANDIDATES,
        cf::FANS,
        cf::PACKAGES,
    ]
}
