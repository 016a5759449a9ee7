//! Common test utilities for fanvote integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};

use fanvote_core::{default_vote_packages, UserId};
use fanvote_service::auth::JwtClaims;
use fanvote_service::{create_router, AppState, ServiceConfig};
use fanvote_store::{seed_packages, MemoryStore, Store};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const JWT_AUDIENCE: &str = "authenticated";
pub const ADMIN_KEY: &str = "test-admin-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Shared state, for observing the notifier and store directly.
    pub state: AppState,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        seed_packages(store.as_ref(), &default_vote_packages()).expect("Failed to seed packages");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: Some(JWT_SECRET.into()),
            jwt_audience: JWT_AUDIENCE.into(),
            admin_api_key: Some(ADMIN_KEY.into()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store, config);
        let router: Router = create_router(state.clone());

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            test_user_id: UserId::generate(),
        }
    }

    /// Authorization header for the test user.
    pub fn user_auth(&self) -> (HeaderName, HeaderValue) {
        Self::auth_for(&self.test_user_id)
    }

    /// Authorization header for any user.
    pub fn auth_for(user_id: &UserId) -> (HeaderName, HeaderValue) {
        bearer(&mint_token(&user_id.to_string(), JWT_SECRET, JWT_AUDIENCE))
    }

    /// Admin key header.
    pub fn admin_auth() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-admin-key"),
            HeaderValue::from_static(ADMIN_KEY),
        )
    }

    /// Fund the test user's wallet through the admin route.
    pub async fn fund(&self, amount: i64) {
        let (name, value) = Self::admin_auth();
        self.server
            .post(&format!("/v1/admin/wallets/{}/credit", self.test_user_id))
            .add_header(name, value)
            .json(&serde_json::json!({ "amount": amount, "reason": "test" }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Sign a session token.
pub fn mint_token(sub: &str, secret: &str, audience: &str) -> String {
    let claims = JwtClaims {
        sub: sub.to_string(),
        aud: audience.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Build a bearer authorization header.
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value"),
    )
}
