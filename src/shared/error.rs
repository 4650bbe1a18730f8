//! Gateway Error Types
//!
//! Errors raised inside the gateway before they are logged and folded into
//! the caller-facing result shapes.
//!
//! # Error Categories
//!
//! - `Provider` - transport or validation failures reported by the backend
//! - `PermissionDenied` - the caller's role does not allow the operation
//! - `NotAuthenticated` - an operation needed a session and none exists
//! - `SerializationError` - a row could not be decoded into its record type
//!
//! # Usage
//!
//! ```rust
//! use rolegate::shared::error::GatewayError;
//!
//! let error = GatewayError::permission_denied("Only admins can update roles");
//! assert_eq!(error.to_string(), "Permission denied: Only admins can update roles");
//! ```
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that can occur inside gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Failure reported by the auth/database backend
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Caller lacks the role the operation requires
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Human-readable error message
        message: String,
    },

    /// No active session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A record could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GatewayError {
    /// Create a new permission error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Whether the backend answered "not found" rather than failing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Provider(err) if err.is_not_found())
    }
}
