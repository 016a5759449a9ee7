//! HTTP request handlers.

pub mod admin;
pub mod catalog;
pub mod counters;
pub mod gifts;
pub mod health;
pub mod realtime;
pub mod transactions;
pub mod wallets;
