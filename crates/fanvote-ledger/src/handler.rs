//! The purchase handler a vote or gift control calls into.
//!
//! The handler owns a processing flag so repeated submissions from the same
//! control are ignored while one is in flight. The flag is per handler: a
//! purchase started from another handler (another tab or device) is not
//! blocked by it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fanvote_core::{CandidateId, GiftType, VotePackage};

use crate::backend::{GiftReceipt, LedgerBackend};
use crate::error::PurchaseError;
use crate::purchase::{Ledger, Session, VoteReceipt};

/// Marks a handler as busy while a purchase runs.
#[derive(Debug, Clone, Default)]
pub struct ProcessingFlag(Arc<AtomicBool>);

impl ProcessingFlag {
    /// Create an idle flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a purchase is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the handler busy, or return `None` if it already is.
    #[must_use]
    pub fn try_begin(&self) -> Option<ProcessingGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard {
                flag: Arc::clone(&self.0),
            })
    }
}

/// Clears the processing flag when dropped.
#[derive(Debug)]
pub struct ProcessingGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs purchases for one session and turns failures into fan-facing text.
pub struct PurchaseHandler<B: ?Sized> {
    ledger: Ledger<B>,
    session: Session,
    processing: ProcessingFlag,
}

impl<B: LedgerBackend + ?Sized> PurchaseHandler<B> {
    /// Create a handler for `session`.
    #[must_use]
    pub fn new(ledger: Ledger<B>, session: Session) -> Self {
        Self {
            ledger,
            session,
            processing: ProcessingFlag::new(),
        }
    }

    /// Whether a purchase is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.is_processing()
    }

    /// Buy `package` for `candidate_id`.
    ///
    /// # Errors
    ///
    /// Returns the message to show the fan.
    pub async fn submit_votes(
        &self,
        candidate_id: CandidateId,
        package: &VotePackage,
    ) -> Result<VoteReceipt, String> {
        let _busy = self.begin()?;

        self.ledger
            .purchase_votes(&self.session, candidate_id, package)
            .await
            .map_err(|e| self.reject(&e))
    }

    /// Send `gift` to `candidate_id`.
    ///
    /// # Errors
    ///
    /// Returns the message to show the fan.
    pub async fn submit_gift(
        &self,
        candidate_id: CandidateId,
        gift: &GiftType,
    ) -> Result<GiftReceipt, String> {
        let _busy = self.begin()?;

        self.ledger
            .purchase_gift(&self.session, candidate_id, gift)
            .await
            .map_err(|e| self.reject(&e))
    }

    fn begin(&self) -> Result<ProcessingGuard, String> {
        self.processing
            .try_begin()
            .ok_or_else(|| self.reject(&PurchaseError::AlreadyProcessing))
    }

    fn reject(&self, error: &PurchaseError) -> String {
        if error.leaves_ledger_inconsistent() {
            tracing::error!(
                user_id = ?self.session.user_id(),
                error = %error,
                "Purchase left the ledger inconsistent; manual reconciliation required"
            );
        } else {
            tracing::debug!(user_id = ?self.session.user_id(), error = %error, "Purchase rejected");
        }
        error.user_message().to_string()
    }
}
