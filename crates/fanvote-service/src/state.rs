//! Application state.

use std::sync::Arc;

use tokio::sync::broadcast;

use fanvote_core::{ChangeEvent, GiftCatalog};
use fanvote_store::{Commit, Store};

use crate::config::ServiceConfig;

/// Fans out committed row changes to realtime subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Notifier {
    /// Create a notifier buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish the candidate and fan rows written by `commit`.
    pub fn publish(&self, commit: &Commit) {
        for event in [
            ChangeEvent::Candidate(commit.candidate.clone()),
            ChangeEvent::Fan(commit.fan.clone()),
        ] {
            // Send fails only when nobody is listening.
            if let Ok(receivers) = self.sender.send(event) {
                tracing::debug!(receivers, "Change event published");
            }
        }
    }

    /// Open a new subscription.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Gift types accepted by `send_gift`.
    pub gifts: GiftCatalog,

    /// Realtime change fan-out.
    pub notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        if config.jwt_secret.is_none() {
            tracing::warn!("JWT_SECRET not configured - fan requests will be rejected");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not configured - wallet credits are disabled");
        }

        let notifier = Notifier::new(config.notifier_capacity);

        Self {
            store,
            config,
            gifts: GiftCatalog::standard(),
            notifier,
        }
    }
}
