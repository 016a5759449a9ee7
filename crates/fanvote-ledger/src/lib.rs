//! Vote and gift purchase flows for fanvote.
//!
//! This crate holds the ledger interaction that turns a fan's purchase into a
//! recorded transaction and a wallet debit, and keeps displayed counters
//! current through realtime change feeds.
//!
//! - [`LedgerBackend`]: the remote operations the flows are built from
//! - [`Ledger`]: the vote flow (read → insert → debit) and the gift procedure call
//! - [`PurchaseHandler`]: the initiating handler, with its processing flag and
//!   user-facing error text
//! - [`Observer`]: counter observation with unsubscribe-on-drop
//! - [`InMemoryBackend`]: an in-process backend with fault injection
//!
//! # Consistency
//!
//! The vote flow is three separate backend calls. Nothing spans the balance
//! read and the debit, so two concurrent purchases can both pass the balance
//! check, and a failed debit leaves a completed transaction whose price was
//! never charged. Gifts go through one atomic backend procedure instead.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fanvote_core::{CandidateId, UserId, VotePackage};
//! use fanvote_ledger::{InMemoryBackend, Ledger, Session};
//!
//! # async fn example() -> Result<(), fanvote_ledger::PurchaseError> {
//! let backend = Arc::new(InMemoryBackend::new());
//! let fan = UserId::generate();
//! backend.fund(fan, 5000);
//!
//! let ledger = Ledger::new(backend);
//! let receipt = ledger
//!     .purchase_votes(
//!         &Session::authenticated(fan),
//!         CandidateId::generate(),
//!         &VotePackage::new("bundle-10", 10, 950),
//!     )
//!     .await?;
//!
//! println!("{} votes, balance now {}", receipt.votes, receipt.balance_after);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod handler;
pub mod memory;
pub mod observer;
pub mod purchase;

pub use backend::{BackendError, ChangeStream, GiftReceipt, LedgerBackend, SubscriptionFilter};
pub use error::PurchaseError;
pub use handler::{ProcessingFlag, ProcessingGuard, PurchaseHandler};
pub use memory::{InMemoryBackend, Operation};
pub use observer::Observer;
pub use purchase::{Ledger, Session, VoteReceipt};
