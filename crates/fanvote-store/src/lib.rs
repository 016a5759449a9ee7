//! Storage layer for fanvote.
//!
//! This crate persists wallets, purchase transactions, the denormalized
//! candidate and fan rows, and the vote package catalog.
//!
//! Inserting a transaction runs the aggregate trigger in the same write: the
//! recipient's `CandidateAggregate` and the sender's `FanPoints` are updated
//! together with the transaction row. Sending a gift additionally checks and
//! debits the wallet in that write, which makes it the one atomic purchase
//! path.
//!
//! # Backends
//!
//! - [`MemoryStore`]: always available, used by tests and ephemeral runs
//! - `RocksStore`: persistent, behind the `rocksdb-backend` feature
//!
//! # Column families (`RocksDB`)
//!
//! - `wallets`: wallet records, keyed by `user_id`
//! - `transactions`: purchase transactions, keyed by `transaction_id` (ULID)
//! - `transactions_by_user`: index for listing transactions by user
//! - `references`: purchase reference index, enforces uniqueness
//! - `candidates` / `fans`: aggregate rows maintained by the trigger
//! - `packages`: the vote package catalog
//!
//! # Example
//!
//! ```
//! use fanvote_core::{CandidateId, PurchaseTransaction, UserId, VotePackage};
//! use fanvote_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let fan = UserId::generate();
//! store.credit_wallet(&fan, 5000).unwrap();
//!
//! let record = PurchaseTransaction::votes(fan, CandidateId::generate(), &VotePackage::new("p", 10, 950));
//! let commit = store.insert_transaction(&record).unwrap();
//! assert_eq!(commit.candidate.votes, 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use fanvote_core::{
    CandidateAggregate, CandidateId, FanPoints, GiftType, PurchaseTransaction, TransactionId,
    UserId, VotePackage, Wallet,
};

/// Rows written by a committed transaction insert.
#[derive(Debug, Clone)]
pub struct Commit {
    /// The stored transaction.
    pub transaction: PurchaseTransaction,

    /// The recipient's totals after the insert.
    pub candidate: CandidateAggregate,

    /// The sender's points after the insert.
    pub fan: FanPoints,
}

/// Result of a committed gift.
#[derive(Debug, Clone)]
pub struct GiftCommit {
    /// The transaction and aggregate rows written.
    pub commit: Commit,

    /// Wallet balance after the debit.
    pub balance_after: i64,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Wallet Operations
    // =========================================================================

    /// Get a wallet by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>>;

    /// Overwrite a wallet's balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the wallet doesn't exist.
    fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<Wallet>;

    /// Add `amount` to a wallet, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn credit_wallet(&self, user_id: &UserId, amount: i64) -> Result<Wallet>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Insert a transaction and apply the aggregate trigger in one write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateReference` if the reference is already stored.
    fn insert_transaction(&self, transaction: &PurchaseTransaction) -> Result<Commit>;

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId)
        -> Result<Option<PurchaseTransaction>>;

    /// List transactions for a user, ordered by time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PurchaseTransaction>>;

    // =========================================================================
    // Aggregate Operations
    // =========================================================================

    /// Get a candidate's totals. A candidate with no activity has zero totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_candidate(&self, candidate_id: &CandidateId) -> Result<CandidateAggregate>;

    /// Get a fan's points. A fan with no activity has zero points.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_fan_points(&self, user_id: &UserId) -> Result<FanPoints>;

    /// Rank of a fan among all fans by points (1 is highest).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn fan_rank(&self, user_id: &UserId) -> Result<usize>;

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// List every vote package, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_packages(&self) -> Result<Vec<VotePackage>>;

    /// Insert or replace a vote package.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_package(&self, package: &VotePackage) -> Result<()>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Send a gift: check the balance, debit it, insert the transaction and
    /// apply the aggregate trigger atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the wallet doesn't exist.
    /// - `StoreError::InsufficientBalance` if the balance is below the gift price.
    fn send_gift(
        &self,
        user_id: &UserId,
        candidate_id: &CandidateId,
        gift: &GiftType,
    ) -> Result<GiftCommit>;
}

/// Seed the package catalog when it is empty.
///
/// Returns the number of packages written.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or written.
pub fn seed_packages(store: &dyn Store, packages: &[VotePackage]) -> Result<usize> {
    if !store.list_packages()?.is_empty() {
        return Ok(0);
    }
    for package in packages {
        store.put_package(package)?;
    }
    tracing::info!(count = packages.len(), "Seeded vote package catalog");
    Ok(packages.len())
}
