//! Fanvote HTTP client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use fanvote_core::{
    CandidateAggregate, CandidateId, FanPoints, GiftType, PurchaseTransaction, TransactionId,
    UserId, VotePackage, Wallet,
};
use fanvote_ledger::{BackendError, ChangeStream, GiftReceipt, LedgerBackend, SubscriptionFilter};

use crate::error::ClientError;
use crate::sse::change_events;
use crate::types::{
    ApiErrorResponse, FanStanding, InsertTransactionResponse, SendGiftRequest,
    UpdateBalanceRequest,
};

/// Fanvote API client.
///
/// Talks to the fanvote service on behalf of one fan session and implements
/// [`LedgerBackend`] so the purchase flows can run against a remote service.
#[derive(Debug, Clone)]
pub struct FanvoteClient {
    client: Client,
    stream_client: Client,
    base_url: String,
    access_token: Option<String>,
    client_name: String,
}

impl FanvoteClient {
    /// Create a new anonymous client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the fanvote service (e.g., `"http://fanvote:8080"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        // Realtime bodies stay open, so only the connect phase is bounded.
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            stream_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
            client_name: options.client_name,
        })
    }

    /// Attach a session token sent as a bearer token on every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Get a fan's wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_wallet(&self, user_id: &UserId) -> Result<Wallet, ClientError> {
        let url = format!("{}/v1/wallets/{user_id}", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Overwrite a fan's balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<Wallet, ClientError> {
        let url = format!("{}/v1/wallets/{user_id}", self.base_url);
        let response = self
            .authorize(self.client.put(&url))
            .json(&UpdateBalanceRequest { balance })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Record a purchase transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn record_transaction(
        &self,
        record: &PurchaseTransaction,
    ) -> Result<TransactionId, ClientError> {
        let url = format!("{}/v1/transactions", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(record)
            .send()
            .await?;

        let body: InsertTransactionResponse = self.handle_response(response).await?;
        Ok(body.id)
    }

    /// Call the gift procedure.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn send_gift(
        &self,
        candidate_id: &CandidateId,
        gift_type: &str,
    ) -> Result<GiftReceipt, ClientError> {
        let url = format!("{}/v1/rpc/send_gift", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&SendGiftRequest {
                candidate_id: *candidate_id,
                gift_type,
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a candidate's totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<CandidateAggregate, ClientError> {
        let url = format!("{}/v1/candidates/{candidate_id}", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Get a fan's points and rank.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_fan_standing(&self, user_id: &UserId) -> Result<FanStanding, ClientError> {
        let url = format!("{}/v1/fans/{user_id}", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// List the vote package catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_packages(&self) -> Result<Vec<VotePackage>, ClientError> {
        let url = format!("{}/v1/packages", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// List the gift catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_gifts(&self) -> Result<Vec<GiftType>, ClientError> {
        let url = format!("{}/v1/gifts", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Open the realtime change feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be opened.
    pub async fn open_feed(&self, filter: SubscriptionFilter) -> Result<ChangeStream, ClientError> {
        let url = format!("{}/v1/realtime", self.base_url);
        let query: Vec<(&str, String)> = match filter {
            SubscriptionFilter::Candidate(id) => vec![("candidate_id", id.to_string())],
            SubscriptionFilter::Fan(id) => vec![("user_id", id.to_string())],
            SubscriptionFilter::AllCandidates => Vec::new(),
        };

        let response = self
            .authorize(self.stream_client.get(&url))
            .header("accept", "text/event-stream")
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        tracing::debug!(filter = ?filter, "Realtime feed opened");
        Ok(change_events(response.bytes_stream()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("x-client-name", &self.client_name);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        Err(Self::handle_error(response).await)
    }

    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status();

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let message = api_error.error.message;

                // Map specific error codes to typed errors
                match api_error.error.code.as_str() {
                    "insufficient_balance" => {
                        let detail = |key: &str| {
                            api_error
                                .error
                                .details
                                .as_ref()
                                .and_then(|d| d.get(key))
                                .and_then(serde_json::Value::as_i64)
                                .unwrap_or(0)
                        };

                        ClientError::InsufficientBalance {
                            balance: detail("balance"),
                            required: detail("required"),
                        }
                    }
                    "duplicate_reference" => ClientError::DuplicateReference { message },
                    "not_found" => ClientError::NotFound { message },
                    code => ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    },
                }
            }
            Err(_) if status == StatusCode::NOT_FOUND => ClientError::NotFound {
                message: format!("HTTP {status}"),
            },
            Err(_) => ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            },
        }
    }
}

#[async_trait]
impl LedgerBackend for FanvoteClient {
    async fn read_balance(&self, user_id: &UserId) -> Result<Wallet, BackendError> {
        Ok(self.get_wallet(user_id).await?)
    }

    async fn insert_transaction(
        &self,
        record: &PurchaseTransaction,
    ) -> Result<TransactionId, BackendError> {
        Ok(self.record_transaction(record).await?)
    }

    async fn update_balance(&self, user_id: &UserId, new_balance: i64) -> Result<(), BackendError> {
        self.set_balance(user_id, new_balance).await?;
        Ok(())
    }

    async fn call_gift_procedure(
        &self,
        _user_id: &UserId,
        candidate_id: &CandidateId,
        gift_type: &str,
    ) -> Result<GiftReceipt, BackendError> {
        // The service takes the sender from the session token.
        Ok(self.send_gift(candidate_id, gift_type).await?)
    }

    async fn subscribe(&self, filter: SubscriptionFilter) -> Result<ChangeStream, BackendError> {
        Ok(self.open_feed(filter).await?)
    }

    async fn read_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<CandidateAggregate, BackendError> {
        Ok(self.get_candidate(candidate_id).await?)
    }

    async fn read_fan_points(&self, user_id: &UserId) -> Result<FanPoints, BackendError> {
        Ok(self.get_fan_standing(user_id).await?.points)
    }

    async fn list_vote_packages(&self) -> Result<Vec<VotePackage>, BackendError> {
        Ok(self.list_packages().await?)
    }

    async fn list_gift_types(&self) -> Result<Vec<GiftType>, BackendError> {
        Ok(self.list_gifts().await?)
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Client name to include in requests.
    pub client_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            client_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a client name.
    #[must_use]
    pub fn with_client_name(name: impl Into<String>) -> Self {
        Self {
            client_name: name.into(),
            ..Self::default()
        }
    }
}
