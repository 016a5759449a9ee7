//! Fanvote HTTP API Service.
//!
//! This crate provides the managed backend the purchase flows talk to:
//!
//! - Wallet reads and balance overwrites
//! - Transaction inserts (with the aggregate trigger) and history
//! - The atomic `send_gift` procedure
//! - Vote package and gift catalogs
//! - Candidate and fan counters, with a server-sent events feed of row changes
//! - Admin wallet top-ups
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **HS256 JWT bearer tokens** - For fan requests. A fan may only read or
//!    write their own wallet, transactions and points.
//! 2. **Admin API key** - For privileged endpoints (wallet credits).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Store calls are sync; handlers stay async for axum

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, Notifier};
