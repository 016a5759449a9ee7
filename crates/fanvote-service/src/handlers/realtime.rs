//! Realtime change feed over server-sent events.
//!
//! Each committed insert or gift publishes the new candidate row and fan row.
//! A subscriber picks one filter per connection:
//!
//! - `?candidate_id=<uuid>`: one candidate's row
//! - `?user_id=<uuid>`: the caller's own points row (auth required)
//! - neither: every candidate row
//!
//! Events are named `change` and carry a `ChangeEvent` as JSON. Closing the
//! connection drops the subscription.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;

use fanvote_core::{CandidateId, UserId};
use fanvote_ledger::SubscriptionFilter;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// SSE event name for row changes.
pub const CHANGE_EVENT: &str = "change";

/// Subscription query parameters.
#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    /// Watch one candidate.
    pub candidate_id: Option<CandidateId>,
    /// Watch the caller's own points.
    pub user_id: Option<UserId>,
}

/// Open a change feed.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    auth: Option<AuthUser>,
    Query(query): Query<RealtimeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let filter = match (query.candidate_id, query.user_id) {
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "Pass candidate_id or user_id, not both".into(),
            ))
        }
        (Some(candidate_id), None) => SubscriptionFilter::Candidate(candidate_id),
        (None, Some(user_id)) => {
            auth.ok_or(ApiError::Unauthorized)?
                .require_owner(&user_id)?;
            SubscriptionFilter::Fan(user_id)
        }
        (None, None) => SubscriptionFilter::AllCandidates,
    };

    tracing::debug!(filter = ?filter, "Realtime subscription opened");

    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(move |item| {
        let event = match item {
            Ok(change) if filter.matches(&change) => {
                match Event::default().event(CHANGE_EVENT).json_data(&change) {
                    Ok(event) => Some(Ok(event)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to encode change event");
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Realtime subscriber lagged");
                None
            }
        };
        futures::future::ready(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
