//! Live counters fed by realtime change streams.
//!
//! An observer seeds itself with a point read, then replaces its value with
//! every matching row state the stream delivers. There is no merging and no
//! ordering check: the last notification applied wins. Dropping the observer
//! stops its pump task, which drops the stream and ends the subscription.

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use fanvote_core::{CandidateAggregate, CandidateId, ChangeEvent, FanPoints, UserId};

use crate::backend::{BackendError, ChangeStream, LedgerBackend, SubscriptionFilter};

/// A value kept current by a change stream.
#[derive(Debug)]
pub struct Observer<T> {
    current: watch::Receiver<T>,
    pump: JoinHandle<()>,
}

impl<T> Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn spawn<F>(initial: T, mut stream: ChangeStream, extract: F) -> Self
    where
        F: Fn(ChangeEvent) -> Option<T> + Send + 'static,
    {
        let (sender, current) = watch::channel(initial);

        let pump = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Some(value) = extract(event) {
                    if sender.send(value).is_err() {
                        break;
                    }
                }
            }
            tracing::debug!("Change stream ended");
        });

        Self { current, pump }
    }

    /// The latest value.
    #[must_use]
    pub fn current(&self) -> T {
        self.current.borrow().clone()
    }

    /// Wait for the next replacement and return it.
    ///
    /// Returns `None` once the stream has ended.
    pub async fn changed(&mut self) -> Option<T> {
        self.current.changed().await.ok()?;
        Some(self.current.borrow_and_update().clone())
    }
}

impl Observer<CandidateAggregate> {
    /// Observe one candidate through a row-scoped subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription or the initial read fails.
    pub async fn candidate<B>(backend: &B, candidate_id: CandidateId) -> Result<Self, BackendError>
    where
        B: LedgerBackend + ?Sized,
    {
        let stream = backend
            .subscribe(SubscriptionFilter::Candidate(candidate_id))
            .await?;
        let initial = backend.read_candidate(&candidate_id).await?;
        Ok(Self::spawn(initial, stream, move |event| {
            candidate_row(event, candidate_id)
        }))
    }

    /// Observe one candidate through a table-wide subscription, filtering
    /// other candidates' rows locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription or the initial read fails.
    pub async fn candidate_via_table<B>(
        backend: &B,
        candidate_id: CandidateId,
    ) -> Result<Self, BackendError>
    where
        B: LedgerBackend + ?Sized,
    {
        let stream = backend.subscribe(SubscriptionFilter::AllCandidates).await?;
        let initial = backend.read_candidate(&candidate_id).await?;
        Ok(Self::spawn(initial, stream, move |event| {
            candidate_row(event, candidate_id)
        }))
    }
}

impl Observer<FanPoints> {
    /// Observe a fan's own points.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription or the initial read fails.
    pub async fn fan<B>(backend: &B, user_id: UserId) -> Result<Self, BackendError>
    where
        B: LedgerBackend + ?Sized,
    {
        let stream = backend.subscribe(SubscriptionFilter::Fan(user_id)).await?;
        let initial = backend.read_fan_points(&user_id).await?;
        Ok(Self::spawn(initial, stream, move |event| match event {
            ChangeEvent::Fan(row) if row.user_id == user_id => Some(row),
            _ => None,
        }))
    }
}

impl<T> Drop for Observer<T> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

fn candidate_row(event: ChangeEvent, candidate_id: CandidateId) -> Option<CandidateAggregate> {
    match event {
        ChangeEvent::Candidate(row) if row.candidate_id == candidate_id => Some(row),
        _ => None,
    }
}
