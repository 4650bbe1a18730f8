//! Shared Module
//!
//! Records, roles, events, errors and configuration used by both the
//! provider implementations and the gateway.

/// Role hierarchy
pub mod role;

/// Backend records and gateway result shapes
pub mod types;

/// Session change events
pub mod event;

/// Gateway error types
pub mod error;

/// Gateway configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, GatewayConfig, GatewayConfigBuilder};
pub use error::GatewayError;
pub use event::{AuthEvent, AuthStateChange};
pub use role::Role;
pub use types::{
    AccessDecision, Credentials, CurrentUser, Identity, OperationResult, Profile,
    RoleAssignment, Session, SignUpData,
};
