//! rolegate - Session & Role Gateway
//!
//! A client-side layer over a hosted auth and database backend (GoTrue +
//! PostgREST). It signs users up, in and out, reads the current session,
//! keeps one row per (user, role) in a role table and answers access
//! questions against a fixed hierarchy: `admin` > `editor` > `user`.
//!
//! # Module Structure
//!
//! - **`shared`** - records, roles, events, errors and configuration
//! - **`provider`** - the backend boundary
//!   - `AuthProvider` / `RecordStore` traits
//!   - `HttpProvider` over reqwest, `MemoryProvider` in-process
//! - **`gateway`** - the operations callers use
//!   - identity: `sign_up`, `sign_in`, `sign_out`, `current_user`,
//!     `require_auth`, `init_auth`
//!   - roles: `get_user_role`, `resolve_role`, `update_user_role`, `is_admin`
//!   - access: `check_access`
//!   - dashboard: `load_admin_dashboard`, `grant_admin`, `revoke_admin`
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use rolegate::gateway::SessionGateway;
//! use rolegate::provider::MemoryProvider;
//! use rolegate::shared::Role;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = SessionGateway::from_provider(Arc::new(MemoryProvider::new()));
//!
//! let signed_up = gateway.sign_up("user@example.com", "password123").await;
//! assert!(signed_up.success);
//!
//! let user = gateway.current_user().await.expect("signed in after sign-up");
//! assert_eq!(user.role, Role::User);
//!
//! let decision = gateway.check_access(Role::Admin).evaluate().await;
//! assert!(!decision.allowed);
//! # }
//! ```
//!
//! # Error Handling
//!
//! Backend failures never reach the caller as errors. Each gateway operation
//! logs them through `tracing` and returns a safe default; see
//! [`gateway`] for the exact policy.

/// Shared types and data structures
pub mod shared;

/// Auth/database backend boundary
pub mod provider;

/// Session & role gateway
pub mod gateway;

pub use gateway::SessionGateway;
pub use shared::{AccessDecision, GatewayConfig, OperationResult, Role};
