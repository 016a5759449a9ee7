//! In-memory storage implementation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fanvote_core::{
    rank_of, CandidateAggregate, CandidateId, FanPoints, GiftType, PurchaseReference,
    PurchaseTransaction, TransactionId, TransactionKind, UserId, VotePackage, Wallet,
};

use crate::error::{Result, StoreError};
use crate::{Commit, GiftCommit, Store};

#[derive(Default)]
struct Tables {
    wallets: HashMap<UserId, Wallet>,
    transactions: BTreeMap<TransactionId, PurchaseTransaction>,
    references: HashSet<PurchaseReference>,
    candidates: HashMap<CandidateId, CandidateAggregate>,
    fans: HashMap<UserId, FanPoints>,
    packages: BTreeMap<String, VotePackage>,
}

impl Tables {
    fn insert(&mut self, transaction: PurchaseTransaction) -> Result<Commit> {
        if self.references.contains(&transaction.reference) {
            return Err(StoreError::DuplicateReference {
                reference: transaction.reference,
            });
        }

        let candidate = self
            .candidates
            .entry(transaction.recipient_id)
            .or_insert_with(|| CandidateAggregate::empty(transaction.recipient_id));
        candidate.apply(&transaction);
        let candidate = candidate.clone();

        let fan = self
            .fans
            .entry(transaction.user_id)
            .or_insert_with(|| FanPoints::empty(transaction.user_id));
        fan.apply(&transaction);
        let fan = fan.clone();

        self.references.insert(transaction.reference.clone());
        self.transactions.insert(transaction.id, transaction.clone());

        Ok(Commit {
            transaction,
            candidate,
            fan,
        })
    }
}

/// Storage held in process memory. Every operation runs under one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        Ok(self.lock().wallets.get(user_id).cloned())
    }

    fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<Wallet> {
        let mut tables = self.lock();
        let wallet = tables.wallets.get_mut(user_id).ok_or(StoreError::NotFound)?;
        wallet.set_balance(balance);
        Ok(wallet.clone())
    }

    fn credit_wallet(&self, user_id: &UserId, amount: i64) -> Result<Wallet> {
        let mut tables = self.lock();
        let wallet = tables
            .wallets
            .entry(*user_id)
            .or_insert_with(|| Wallet::new(*user_id));
        let balance = wallet
            .balance
            .checked_add(amount)
            .ok_or(StoreError::BalanceOverflow {
                balance: wallet.balance,
                amount,
            })?;
        wallet.set_balance(balance);
        Ok(wallet.clone())
    }

    fn insert_transaction(&self, transaction: &PurchaseTransaction) -> Result<Commit> {
        self.lock().insert(transaction.clone())
    }

    fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PurchaseTransaction>> {
        Ok(self.lock().transactions.get(transaction_id).cloned())
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PurchaseTransaction>> {
        // ULID order is creation order, so reverse iteration is newest first.
        Ok(self
            .lock()
            .transactions
            .values()
            .rev()
            .filter(|tx| tx.user_id == *user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_candidate(&self, candidate_id: &CandidateId) -> Result<CandidateAggregate> {
        Ok(self
            .lock()
            .candidates
            .get(candidate_id)
            .cloned()
            .unwrap_or_else(|| CandidateAggregate::empty(*candidate_id)))
    }

    fn get_fan_points(&self, user_id: &UserId) -> Result<FanPoints> {
        Ok(self
            .lock()
            .fans
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| FanPoints::empty(*user_id)))
    }

    fn fan_rank(&self, user_id: &UserId) -> Result<usize> {
        let tables = self.lock();
        let points = tables.fans.get(user_id).map_or(0, |f| f.points);
        Ok(rank_of(points, tables.fans.values()))
    }

    fn list_packages(&self) -> Result<Vec<VotePackage>> {
        Ok(self.lock().packages.values().cloned().collect())
    }

    fn put_package(&self, package: &VotePackage) -> Result<()> {
        self.lock()
            .packages
            .insert(package.id.clone(), package.clone());
        Ok(())
    }

    fn send_gift(
        &self,
        user_id: &UserId,
        candidate_id: &CandidateId,
        gift: &GiftType,
    ) -> Result<GiftCommit> {
        let mut tables = self.lock();

        let balance = tables
            .wallets
            .get(user_id)
            .ok_or(StoreError::NotFound)?
            .balance;
        if balance < gift.price {
            return Err(StoreError::InsufficientBalance {
                balance,
                required: gift.price,
            });
        }

        let transaction = PurchaseTransaction::gift(
            *user_id,
            *candidate_id,
            gift,
            PurchaseReference::generate(TransactionKind::Gift.reference_prefix()),
        );
        let commit = tables.insert(transaction)?;

        let balance_after = balance - gift.price;
        if let Some(wallet) = tables.wallets.get_mut(user_id) {
            wallet.set_balance(balance_after);
        }

        Ok(GiftCommit {
            commit,
            balance_after,
        })
    }
}
