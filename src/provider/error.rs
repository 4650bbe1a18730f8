/**
 * Provider Error Types
 *
 * Failures reported by an auth/database backend, independent of which
 * provider implementation produced them.
 *
 * # Error Categories
 *
 * ## Transport
 *
 * The request never produced an HTTP response: DNS, TLS, connection reset,
 * timeout.
 *
 * ## Api
 *
 * The backend answered with a non-success status. The message is taken from
 * the body (`msg`, `message`, `error_description` or `error`, in that order).
 *
 * ## RowCount
 *
 * A single or maybe-single fetch saw the wrong number of rows.
 */

use serde::Deserialize;
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Error code PostgREST returns when a single-row request matched 0 or >1 rows
pub const SINGLE_ROW_CODE: &str = "PGRST116";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request could not be completed
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the request
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Backend error code, e.g. `invalid_credentials` or `PGRST116`
        code: Option<String>,
        /// Human-readable error message
        message: String,
    },

    /// A single-row fetch matched the wrong number of rows
    #[error("JSON object requested, expected {expected} row(s) but found {found}")]
    RowCount { expected: usize, found: usize },

    /// The backend answered with something we cannot interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProviderError {
    /// Create a new API error
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Whether this error means "no such row" rather than a failed request
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RowCount { found: 0, .. } => true,
            Self::Api { status: 404, .. } => true,
            Self::Api { code: Some(code), .. } => code == SINGLE_ROW_CODE,
            _ => false,
        }
    }

    /// Whether retrying the same request may succeed: transport failures and
    /// 5xx answers. A 4xx is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status, when the backend produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Error body shapes of GoTrue (`msg`, `error_description`) and PostgREST
/// (`message`, `code`).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
    code: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Builds an `Api` error from a status and raw body text.
    pub(crate) fn into_error(status: u16, body: &str, fallback: &str) -> ProviderError {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        let message = parsed
            .msg
            .or(parsed.message)
            .or(parsed.error_description)
            .or_else(|| parsed.error.clone())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    fallback.to_string()
                } else {
                    body.trim().to_string()
                }
            });

        let code = parsed
            .error_code
            .or_else(|| match parsed.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => None,
            })
            .or(parsed.error);

        ProviderError::Api {
            status,
            code,
            message,
        }
    }
}
