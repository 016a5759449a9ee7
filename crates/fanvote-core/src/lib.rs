//! Core types and utilities for fanvote.
//!
//! This crate provides the foundational types shared by the ledger flows, the
//! storage layer, the HTTP service and the client SDK:
//!
//! - **Identifiers**: `UserId`, `CandidateId`, `TransactionId`, `PurchaseReference`
//! - **Wallets**: `Wallet`
//! - **Transactions**: `PurchaseTransaction`, `TransactionKind`, `TransactionStatus`
//! - **Catalog**: `VotePackage`, `GiftType`, `GiftCatalog`
//! - **Aggregates**: `CandidateAggregate`, `FanPoints`, `ChangeEvent`
//!
//! # Amounts
//!
//! Every balance and price is an `i64` in minor currency units. A package
//! priced `1000` costs exactly 1000 units of wallet balance.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod transaction;

pub use account::Wallet;
pub use aggregate::{rank_of, CandidateAggregate, ChangeEvent, FanPoints};
pub use catalog::{default_vote_packages, GiftCatalog, GiftType, VotePackage};
pub use error::{LedgerError, Result};
pub use ids::{CandidateId, IdError, PurchaseReference, TransactionId, UserId};
pub use transaction::{
    rounded_unit_price, PurchaseTransaction, TransactionKind, TransactionStatus,
};
