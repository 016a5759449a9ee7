//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Writes that read before they write (balance updates, inserts with the
//! aggregate trigger, gifts) hold a process-wide write lock and land in a
//! single `WriteBatch`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use fanvote_core::{
    rank_of, CandidateAggregate, CandidateId, FanPoints, GiftType, PurchaseReference,
    PurchaseTransaction, TransactionId, TransactionKind, UserId, VotePackage, Wallet,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Commit, GiftCommit, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|item| {
                let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                Self::deserialize(&value)
            })
            .collect()
    }

    /// Stage a transaction and its trigger updates into `batch`.
    ///
    /// Caller must hold the write lock.
    fn stage_insert(
        &self,
        batch: &mut WriteBatch,
        transaction: &PurchaseTransaction,
    ) -> Result<Commit> {
        let reference_key = keys::reference_key(&transaction.reference);
        let cf_refs = self.cf(cf::REFERENCES)?;
        let taken = self
            .db
            .get_cf(&cf_refs, &reference_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(StoreError::DuplicateReference {
                reference: transaction.reference.clone(),
            });
        }

        let candidate_key = keys::candidate_key(&transaction.recipient_id);
        let mut candidate = self
            .get::<CandidateAggregate>(cf::CANDIDATES, &candidate_key)?
            .unwrap_or_else(|| CandidateAggregate::empty(transaction.recipient_id));
        candidate.apply(transaction);

        let fan_key = keys::fan_key(&transaction.user_id);
        let mut fan = self
            .get::<FanPoints>(cf::FANS, &fan_key)?
            .unwrap_or_else(|| FanPoints::empty(transaction.user_id));
        fan.apply(transaction);

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_candidates = self.cf(cf::CANDIDATES)?;
        let cf_fans = self.cf(cf::FANS)?;

        batch.put_cf(
            &cf_tx,
            keys::transaction_key(&transaction.id),
            Self::serialize(transaction)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_transaction_key(&transaction.user_id, &transaction.id),
            [],
        );
        batch.put_cf(&cf_refs, &reference_key, transaction.id.to_bytes());
        batch.put_cf(&cf_candidates, &candidate_key, Self::serialize(&candidate)?);
        batch.put_cf(&cf_fans, &fan_key, Self::serialize(&fan)?);

        Ok(Commit {
            transaction: transaction.clone(),
            candidate,
            fan,
        })
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Wallet Operations
    // =========================================================================

    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.get(cf::WALLETS, &keys::wallet_key(user_id))
    }

    fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<Wallet> {
        let _guard = self.lock_writes();
        let cf = self.cf(cf::WALLETS)?;
        let key = keys::wallet_key(user_id);

        let mut wallet = self
            .get::<Wallet>(cf::WALLETS, &key)?
            .ok_or(StoreError::NotFound)?;
        wallet.set_balance(balance);

        self.db
            .put_cf(&cf, key, Self::serialize(&wallet)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(wallet)
    }

    fn credit_wallet(&self, user_id: &UserId, amount: i64) -> Result<Wallet> {
        let _guard = self.lock_writes();
        let cf = self.cf(cf::WALLETS)?;
        let key = keys::wallet_key(user_id);

        let mut wallet = self
            .get::<Wallet>(cf::WALLETS, &key)?
            .unwrap_or_else(|| Wallet::new(*user_id));
        let balance = wallet
            .balance
            .checked_add(amount)
            .ok_or(StoreError::BalanceOverflow {
                balance: wallet.balance,
                amount,
            })?;
        wallet.set_balance(balance);

        self.db
            .put_cf(&cf, key, Self::serialize(&wallet)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(wallet)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn insert_transaction(&self, transaction: &PurchaseTransaction) -> Result<Commit> {
        let _guard = self.lock_writes();
        let mut batch = WriteBatch::default();
        let commit = self.stage_insert(&mut batch, transaction)?;
        self.write(batch)?;
        Ok(commit)
    }

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PurchaseTransaction>> {
        self.get(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PurchaseTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // Collect all matching keys first (since ULIDs are naturally time-ordered)
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            all_keys.push(key.to_vec());
        }

        // Reverse to get newest first
        all_keys.reverse();

        let mut transactions = Vec::new();
        for key in all_keys.iter().skip(offset).take(limit) {
            let tx_id = keys::extract_transaction_id_from_user_key(key).ok_or_else(|| {
                StoreError::Database("malformed transactions_by_user key".to_string())
            })?;
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Aggregate Operations
    // =========================================================================

    fn get_candidate(&self, candidate_id: &CandidateId) -> Result<CandidateAggregate> {
        Ok(self
            .get(cf::CANDIDATES, &keys::candidate_key(candidate_id))?
            .unwrap_or_else(|| CandidateAggregate::empty(*candidate_id)))
    }

    fn get_fan_points(&self, user_id: &UserId) -> Result<FanPoints> {
        Ok(self
            .get(cf::FANS, &keys::fan_key(user_id))?
            .unwrap_or_else(|| FanPoints::empty(*user_id)))
    }

    fn fan_rank(&self, user_id: &UserId) -> Result<usize> {
        let fans: Vec<FanPoints> = self.scan(cf::FANS)?;
        let points = fans
            .iter()
            .find(|f| f.user_id == *user_id)
            .map_or(0, |f| f.points);
        Ok(rank_of(points, &fans))
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    fn list_packages(&self) -> Result<Vec<VotePackage>> {
        self.scan(cf::PACKAGES)
    }

    fn put_package(&self, package: &VotePackage) -> Result<()> {
        let cf = self.cf(cf::PACKAGES)?;
        self.db
            .put_cf(&cf, keys::package_key(&package.id), Self::serialize(package)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn send_gift(
        &self,
        user_id: &UserId,
        candidate_id: &CandidateId,
        gift: &GiftType,
    ) -> Result<GiftCommit> {
        let _guard = self.lock_writes();

        let wallet_key = keys::wallet_key(user_id);
        let mut wallet = self
            .get::<Wallet>(cf::WALLETS, &wallet_key)?
            .ok_or(StoreError::NotFound)?;

        if !wallet.has_sufficient_balance(gift.price) {
            return Err(StoreError::InsufficientBalance {
                balance: wallet.balance,
                required: gift.price,
            });
        }

        let transaction = PurchaseTransaction::gift(
            *user_id,
            *candidate_id,
            gift,
            PurchaseReference::generate(TransactionKind::Gift.reference_prefix()),
        );

        let mut batch = WriteBatch::default();
        let commit = self.stage_insert(&mut batch, &transaction)?;

        let balance_after = wallet.balance - gift.price;
        wallet.set_balance(balance_after);
        let cf_wallets = self.cf(cf::WALLETS)?;
        batch.put_cf(&cf_wallets, &wallet_key, Self::serialize(&wallet)?);

        // Write atomically
        self.write(batch)?;

        Ok(GiftCommit {
            commit,
            balance_after,
        })
    }
}
