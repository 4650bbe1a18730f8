//! Session & Role Gateway
//!
//! Sits between caller code and the auth/database backend. It proxies
//! identity operations and keeps the one-row-per-(user, role) mapping in the
//! role table.
//!
//! # Architecture
//!
//! ```text
//! gateway/
//! ├── mod.rs       - SessionGateway and construction
//! ├── auth.rs      - sign up/in/out, current user, require_auth, init_auth
//! ├── roles.rs     - role lookup, assignment and the admin gate
//! ├── access.rs    - role hierarchy decisions
//! └── dashboard.rs - admin dashboard data and its two actions
//! ```
//!
//! # Failure Policy
//!
//! Public operations never return the backend's errors. Each failure is
//! logged through `tracing` and folded into a safe default: an
//! [`OperationResult`](crate::shared::types::OperationResult) with
//! `success: false`, `None`, `false`, or the `user` role. The strict
//! accessors [`SessionGateway::try_current_user`] and
//! [`SessionGateway::resolve_role`] expose the underlying outcome.
//!
//! # Example
//!
//! ```rust,no_run
//! use rolegate::gateway::SessionGateway;
//! use rolegate::shared::{GatewayConfig, Role};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let gateway = SessionGateway::connect(config)?;
//!
//! let result = gateway.sign_in("user@example.com", "password123").await;
//! if result.success {
//!     let decision = gateway.check_access(Role::Editor).evaluate().await;
//!     println!("editor access: {}", decision.allowed);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::provider::{AuthProvider, HttpProvider, ProviderError, RecordStore};
use crate::shared::config::{
    GatewayConfig, DEFAULT_LOGIN_REDIRECT, DEFAULT_PROFILE_TABLE, DEFAULT_ROLE_TABLE,
};

pub mod access;
pub mod auth;
pub mod dashboard;
pub mod roles;

pub use access::{decide, AccessGuard};
pub use auth::{AuthSubscription, Redirector};
pub use dashboard::{AdminDashboard, DashboardEntry};
pub use roles::RoleLookup;

/// Gateway over an injected auth provider and record store
#[derive(Clone)]
pub struct SessionGateway {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn RecordStore>,
    role_table: String,
    profile_table: String,
    login_redirect: String,
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway")
            .field("role_table", &self.role_table)
            .field("profile_table", &self.profile_table)
            .field("login_redirect", &self.login_redirect)
            .finish_non_exhaustive()
    }
}

impl SessionGateway {
    /// Gateway with the default table names and login target
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            auth,
            store,
            role_table: DEFAULT_ROLE_TABLE.to_string(),
            profile_table: DEFAULT_PROFILE_TABLE.to_string(),
            login_redirect: DEFAULT_LOGIN_REDIRECT.to_string(),
        }
    }

    /// Gateway over one provider serving both auth and tables
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: AuthProvider + RecordStore + 'static,
    {
        Self::new(provider.clone(), provider)
    }

    /// Gateway over an [`HttpProvider`] built from `config`
    pub fn connect(config: GatewayConfig) -> Result<Self, ProviderError> {
        let provider = Arc::new(HttpProvider::new(config.clone())?);
        Ok(Self::from_provider(provider).with_config(&config))
    }

    /// Take table names and login target from `config`
    pub fn with_config(mut self, config: &GatewayConfig) -> Self {
        self.role_table = config.role_table.clone();
        self.profile_table = config.profile_table.clone();
        self.login_redirect = config.login_redirect.clone();
        self
    }

    pub fn role_table(&self) -> &str {
        &self.role_table
    }

    pub fn profile_table(&self) -> &str {
        &self.profile_table
    }

    pub fn login_redirect(&self) -> &str {
        &self.login_redirect
    }
}
