//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, catalog, counters, gifts, health, realtime, transactions, wallets};
use crate::state::AppState;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/packages` - Vote package catalog
/// - `GET /v1/gifts` - Gift catalog
/// - `GET /v1/candidates/:candidate_id` - Candidate totals
///
/// ## Fan (JWT auth, own rows only)
/// - `GET /v1/wallets/:user_id` - Read wallet
/// - `PUT /v1/wallets/:user_id` - Overwrite balance
/// - `POST /v1/transactions` - Record a purchase
/// - `GET /v1/transactions` - Transaction history
/// - `POST /v1/rpc/send_gift` - Atomic gift procedure
/// - `GET /v1/fans/:user_id` - Points and rank
///
/// ## Realtime (no concurrency limit, long-lived)
/// - `GET /v1/realtime` - Server-sent change events
///
/// ## Admin (admin key)
/// - `POST /v1/admin/wallets/:user_id/credit` - Credit a wallet
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Create concurrency-limited API routes
    let api_routes = Router::new()
        // Catalog
        .route("/packages", get(catalog::list_packages))
        .route("/gifts", get(catalog::list_gifts))
        // Wallets
        .route(
            "/wallets/:user_id",
            get(wallets::get_wallet).put(wallets::update_balance),
        )
        // Transactions
        .route(
            "/transactions",
            post(transactions::insert_transaction).get(transactions::list_transactions),
        )
        // Procedures
        .route("/rpc/send_gift", post(gifts::send_gift))
        // Counters
        .route("/candidates/:candidate_id", get(counters::get_candidate))
        .route("/fans/:user_id", get(counters::get_fan))
        // Admin
        .route(
            "/admin/wallets/:user_id/credit",
            post(admin::credit_wallet),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Realtime feed (held open, outside the concurrency limit)
        .route("/v1/realtime", get(realtime::subscribe))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
