//! Client error types.

use fanvote_ledger::BackendError;

/// Errors that can occur when using the fanvote client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The wallet cannot cover the gift.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The transaction reference was already recorded.
    #[error("duplicate reference: {message}")]
    DuplicateReference {
        /// Server message naming the reference.
        message: String,
    },

    /// The row or catalog entry does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Server message.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_decode() => Self::Decode(e.to_string()),
            ClientError::Http(e) => Self::Unavailable(e.to_string()),
            ClientError::Api { status, message, .. } if status >= 500 => {
                Self::Unavailable(message)
            }
            ClientError::Api {
                code,
                message,
                status,
            } => Self::Rejected {
                status,
                code,
                message,
            },
            ClientError::InsufficientBalance { balance, required } => Self::Procedure {
                message: format!("insufficient_balance: balance={balance}, required={required}"),
            },
            ClientError::DuplicateReference { message } => Self::Rejected {
                status: 409,
                code: "duplicate_reference".into(),
                message,
            },
            ClientError::NotFound { message } => Self::NotFound(message),
            ClientError::Serialization(e) => Self::Decode(e.to_string()),
            ClientError::Configuration(message) => Self::Unavailable(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_becomes_procedure_text() {
        let err: BackendError = ClientError::InsufficientBalance {
            balance: 100,
            required: 500,
        }
        .into();

        match err {
            BackendError::Procedure { message } => {
                assert!(message.starts_with("insufficient_balance"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn server_errors_are_unavailable() {
        let err: BackendError = ClientError::Api {
            code: "internal_error".into(),
            message: "An internal error occurred".into(),
            status: 503,
        }
        .into();
        assert!(matches!(err, BackendError::Unavailable(_)));

        let err: BackendError = ClientError::Api {
            code: "bad_request".into(),
            message: "unit_count must be positive".into(),
            status: 400,
        }
        .into();
        assert!(matches!(err, BackendError::Rejected { status: 400, .. }));
    }
}
