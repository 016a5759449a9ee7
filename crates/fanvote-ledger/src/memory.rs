//! In-process ledger backend.
//!
//! Behaves like the managed backend from the flows' point of view: separate
//! calls with no cross-call transaction, an insert trigger that folds each
//! transaction into the candidate and fan rows, and an atomic gift
//! procedure. Any operation can be made to fail, and balance reads can be
//! held at a barrier so concurrent flows interleave deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, Barrier};
use tokio_stream::wrappers::BroadcastStream;

use fanvote_core::{
    default_vote_packages, CandidateAggregate, CandidateId, ChangeEvent, FanPoints, GiftCatalog,
    GiftType, PurchaseReference, PurchaseTransaction, TransactionId, TransactionKind, UserId,
    VotePackage, Wallet,
};

use crate::backend::{BackendError, ChangeStream, GiftReceipt, LedgerBackend, SubscriptionFilter};

/// Capacity of the change broadcast channel.
const CHANNEL_CAPACITY: usize = 256;

/// A backend operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `read_balance`
    ReadBalance,
    /// `insert_transaction`
    InsertTransaction,
    /// `update_balance`
    UpdateBalance,
    /// `call_gift_procedure`
    GiftProcedure,
    /// `subscribe`
    Subscribe,
    /// `list_vote_packages`
    ListPackages,
}

#[derive(Default)]
struct State {
    wallets: HashMap<UserId, Wallet>,
    transactions: Vec<PurchaseTransaction>,
    references: HashSet<PurchaseReference>,
    candidates: HashMap<CandidateId, CandidateAggregate>,
    fans: HashMap<UserId, FanPoints>,
    packages: Vec<VotePackage>,
    failures: HashSet<Operation>,
}

impl State {
    fn check(&self, operation: Operation) -> Result<(), BackendError> {
        if self.failures.contains(&operation) {
            return Err(BackendError::Unavailable(format!(
                "injected failure: {operation:?}"
            )));
        }
        Ok(())
    }

    /// Append `record` and fold it into the aggregate rows.
    fn commit(&mut self, record: PurchaseTransaction) -> Vec<ChangeEvent> {
        let candidate = self
            .candidates
            .entry(record.recipient_id)
            .or_insert_with(|| CandidateAggregate::empty(record.recipient_id));
        candidate.apply(&record);
        let candidate = candidate.clone();

        let fan = self
            .fans
            .entry(record.user_id)
            .or_insert_with(|| FanPoints::empty(record.user_id));
        fan.apply(&record);
        let fan = fan.clone();

        self.references.insert(record.reference.clone());
        self.transactions.push(record);

        vec![ChangeEvent::Candidate(candidate), ChangeEvent::Fan(fan)]
    }
}

/// A ledger backend held in process memory.
pub struct InMemoryBackend {
    state: Mutex<State>,
    gifts: GiftCatalog,
    changes: broadcast::Sender<ChangeEvent>,
    read_barrier: Option<Arc<Barrier>>,
}

impl InMemoryBackend {
    /// Create a backend seeded with the default catalogs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_packages(default_vote_packages())
    }

    /// Create a backend with a custom vote package catalog.
    #[must_use]
    pub fn with_packages(packages: Vec<VotePackage>) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(State {
                packages,
                ..State::default()
            }),
            gifts: GiftCatalog::standard(),
            changes,
            read_barrier: None,
        }
    }

    /// Hold every balance read until `readers` reads are waiting.
    #[must_use]
    pub fn with_read_barrier(mut self, readers: usize) -> Self {
        self.read_barrier = Some(Arc::new(Barrier::new(readers)));
        self
    }

    /// Set a fan's balance, creating the wallet if needed.
    pub fn fund(&self, user_id: UserId, balance: i64) {
        self.lock()
            .wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::new(user_id))
            .set_balance(balance);
    }

    /// A fan's stored balance, if the wallet exists.
    #[must_use]
    pub fn balance(&self, user_id: &UserId) -> Option<i64> {
        self.lock().wallets.get(user_id).map(|w| w.balance)
    }

    /// Every recorded transaction, oldest first.
    #[must_use]
    pub fn transactions(&self) -> Vec<PurchaseTransaction> {
        self.lock().transactions.clone()
    }

    /// Make `operation` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, operation: Operation) {
        self.lock().failures.insert(operation);
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: Operation) {
        self.lock().failures.remove(&operation);
    }

    /// Number of open change subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Publish a row change directly.
    pub fn publish(&self, event: ChangeEvent) {
        // No receivers is fine.
        let _ = self.changes.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_all(&self, events: Vec<ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerBackend for InMemoryBackend {
    async fn read_balance(&self, user_id: &UserId) -> Result<Wallet, BackendError> {
        let wallet = {
            let state = self.lock();
            state.check(Operation::ReadBalance)?;
            state
                .wallets
                .get(user_id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(format!("wallet {user_id}")))?
        };

        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }

        Ok(wallet)
    }

    async fn insert_transaction(
        &self,
        record: &PurchaseTransaction,
    ) -> Result<TransactionId, BackendError> {
        let events = {
            let mut state = self.lock();
            state.check(Operation::InsertTransaction)?;

            record.validate().map_err(|e| BackendError::Rejected {
                status: 400,
                code: "invalid_transaction".into(),
                message: e.to_string(),
            })?;

            if state.references.contains(&record.reference) {
                return Err(BackendError::Rejected {
                    status: 409,
                    code: "duplicate_reference".into(),
                    message: format!("reference {} already used", record.reference),
                });
            }

            state.commit(record.clone())
        };

        self.publish_all(events);
        Ok(record.id)
    }

    async fn update_balance(&self, user_id: &UserId, new_balance: i64) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.check(Operation::UpdateBalance)?;
        state
            .wallets
            .get_mut(user_id)
            .ok_or_else(|| BackendError::NotFound(format!("wallet {user_id}")))?
            .set_balance(new_balance);
        Ok(())
    }

    async fn call_gift_procedure(
        &self,
        user_id: &UserId,
        candidate_id: &CandidateId,
        gift_type: &str,
    ) -> Result<GiftReceipt, BackendError> {
        let gift = self
            .gifts
            .find(gift_type)
            .ok_or_else(|| BackendError::NotFound(format!("gift type {gift_type}")))?;

        let (receipt, events) = {
            let mut state = self.lock();
            state.check(Operation::GiftProcedure)?;

            let wallet = state
                .wallets
                .get_mut(user_id)
                .ok_or_else(|| BackendError::NotFound(format!("wallet {user_id}")))?;

            if !wallet.has_sufficient_balance(gift.price) {
                return Err(BackendError::Procedure {
                    message: format!(
                        "insufficient_balance: balance {} is below gift price {}",
                        wallet.balance, gift.price
                    ),
                });
            }

            let balance_after = wallet.balance - gift.price;
            wallet.set_balance(balance_after);

            let record = PurchaseTransaction::gift(
                *user_id,
                *candidate_id,
                gift,
                PurchaseReference::generate(TransactionKind::Gift.reference_prefix()),
            );
            let receipt = GiftReceipt {
                transaction_id: record.id,
                reference: record.reference.clone(),
                balance_after,
            };
            (receipt, state.commit(record))
        };

        self.publish_all(events);
        Ok(receipt)
    }

    async fn subscribe(&self, filter: SubscriptionFilter) -> Result<ChangeStream, BackendError> {
        self.lock().check(Operation::Subscribe)?;

        let stream = BroadcastStream::new(self.changes.subscribe()).filter_map(move |item| {
            let event = match item {
                Ok(event) if filter.matches(&event) => Some(event),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Change subscriber lagged");
                    None
                }
            };
            futures::future::ready(event)
        });

        Ok(stream.boxed())
    }

    async fn read_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<CandidateAggregate, BackendError> {
        Ok(self
            .lock()
            .candidates
            .get(candidate_id)
            .cloned()
            .unwrap_or_else(|| CandidateAggregate::empty(*candidate_id)))
    }

    async fn read_fan_points(&self, user_id: &UserId) -> Result<FanPoints, BackendError> {
        Ok(self
            .lock()
            .fans
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| FanPoints::empty(*user_id)))
    }

    async fn list_vote_packages(&self) -> Result<Vec<VotePackage>, BackendError> {
        let state = self.lock();
        state.check(Operation::ListPackages)?;
        Ok(state.packages.clone())
    }

    async fn list_gift_types(&self) -> Result<Vec<GiftType>, BackendError> {
        Ok(self.gifts.gifts().to_vec())
    }
}
