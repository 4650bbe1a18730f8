//! Access decisions over the static role hierarchy (`admin:3, editor:2, user:1`).

use crate::gateway::SessionGateway;
use crate::shared::role::Role;
use crate::shared::types::AccessDecision;

pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required";
pub const CHECK_FAILED_MESSAGE: &str = "Error checking permissions";

/// Compare a caller's role against the required one.
///
/// Allowed iff both roles are ranked and the caller's rank is at least the
/// required rank.
pub fn decide(user_role: &Role, required_role: &Role) -> AccessDecision {
    if user_role.dominates(required_role) {
        AccessDecision::allow()
    } else {
        AccessDecision::deny(format!(
            "Permission denied: {} role required",
            required_role
        ))
    }
}

/// Reusable check bound to one gateway and one required role
#[derive(Debug, Clone)]
pub struct AccessGuard<'a> {
    gateway: &'a SessionGateway,
    required: Role,
}

impl AccessGuard<'_> {
    pub fn required_role(&self) -> &Role {
        &self.required
    }

    /// Resolve the caller and decide.
    ///
    /// A backend failure while reading the session denies with
    /// "Error checking permissions" instead of reporting the caller as
    /// signed out, so an outage is not mistaken for a missing login.
    pub async fn evaluate(&self) -> AccessDecision {
        match self.gateway.try_current_user().await {
            Ok(Some(user)) => decide(&user.role, &self.required),
            Ok(None) => AccessDecision::deny(AUTH_REQUIRED_MESSAGE),
            Err(e) => {
                tracing::error!("Error checking access: {}", e);
                AccessDecision::deny(CHECK_FAILED_MESSAGE)
            }
        }
    }
}

impl SessionGateway {
    /// Build a check for `required_role`; nothing is evaluated until
    /// [`AccessGuard::evaluate`].
    pub fn check_access(&self, required_role: impl Into<Role>) -> AccessGuard<'_> {
        AccessGuard {
            gateway: self,
            required: required_role.into(),
        }
    }
}
