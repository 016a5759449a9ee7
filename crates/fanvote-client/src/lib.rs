//! Fanvote Client SDK.
//!
//! An HTTP [`LedgerBackend`](fanvote_ledger::LedgerBackend) for the fanvote
//! service, so the purchase flows in `fanvote-ledger` can run in a fan's
//! session against a deployed service.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fanvote_client::FanvoteClient;
//! use fanvote_core::{CandidateId, UserId, VotePackage};
//! use fanvote_ledger::{Ledger, Session};
//!
//! # async fn example(fan: UserId, token: String) -> Result<(), Box<dyn std::error::Error>> {
//! let client = FanvoteClient::new("http://fanvote.internal:8080")?.with_access_token(token);
//! let ledger = Ledger::new(Arc::new(client));
//!
//! let receipt = ledger
//!     .purchase_votes(
//!         &Session::authenticated(fan),
//!         CandidateId::generate(),
//!         &VotePackage::new("bundle-10", 10, 950),
//!     )
//!     .await?;
//!
//! println!("Recorded {}", receipt.reference);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod sse;
mod types;

pub use client::{ClientOptions, FanvoteClient};
pub use error::ClientError;
pub use sse::{change_events, CHANGE_EVENT};
pub use types::*;
