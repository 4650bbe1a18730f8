/**
 * Role Management
 *
 * Reads and writes rows of the role table (`user_roles {user_id, role}`).
 *
 * # Resolution
 *
 * A user may hold several rows. The effective role is the highest-ranked
 * one; a user with no rows, or whose rows cannot be read, is `user`.
 * [`RoleLookup`] keeps those two fallbacks apart for callers that care.
 *
 * # Writes
 *
 * Rows are upserted on the table's primary key. With the usual
 * `(user_id, role)` key a write adds a role next to existing ones; it never
 * removes any. Only [`SessionGateway::remove_role`] deletes rows.
 */

use serde::Deserialize;
use uuid::Uuid;

use crate::gateway::SessionGateway;
use crate::provider::Query;
use crate::shared::error::GatewayError;
use crate::shared::role::Role;
use crate::shared::types::RoleAssignment;

/// Message used when a non-admin tries to change roles
pub const ADMIN_ONLY_MESSAGE: &str = "Only admins can update roles";

/// Outcome of reading a user's role rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleLookup {
    /// Highest-ranked role among the user's rows
    Assigned(Role),
    /// The user has no rows
    NoAssignment,
    /// The rows could not be read
    LookupFailed(String),
}

impl RoleLookup {
    /// The role to act on: the assigned one, otherwise `user`
    pub fn effective(&self) -> Role {
        match self {
            RoleLookup::Assigned(role) => role.clone(),
            RoleLookup::NoAssignment | RoleLookup::LookupFailed(_) => Role::User,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RoleLookup::LookupFailed(_))
    }
}

#[derive(Debug, Deserialize)]
struct RoleColumn {
    role: Role,
}

impl SessionGateway {
    /// Read every role row of `user_id` and pick the highest.
    pub async fn resolve_role(&self, user_id: Uuid) -> RoleLookup {
        let query = Query::table(&self.role_table)
            .select("role")
            .eq("user_id", user_id);

        let rows = match self.store.select(&query).await {
            Ok(rows) => rows,
            Err(e) => return RoleLookup::LookupFailed(e.to_string()),
        };

        let mut roles = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<RoleColumn>(row) {
                Ok(column) => roles.push(column.role),
                Err(e) => return RoleLookup::LookupFailed(format!("malformed role row: {}", e)),
            }
        }

        match Role::highest(roles) {
            Some(role) => RoleLookup::Assigned(role),
            None => RoleLookup::NoAssignment,
        }
    }

    /// Effective role of `user_id`; `user` when unassigned or on error.
    pub async fn get_user_role(&self, user_id: Uuid) -> Role {
        let lookup = self.resolve_role(user_id).await;
        if let RoleLookup::LookupFailed(reason) = &lookup {
            tracing::error!("Error getting user role for {}: {}", user_id, reason);
        }
        lookup.effective()
    }

    /// Write a role row. Reports failure as `false`.
    pub(crate) async fn assign_role(&self, user_id: Uuid, role: &Role) -> bool {
        let row = RoleAssignment {
            user_id,
            role: role.clone(),
        };
        let result = match serde_json::to_value(&row) {
            Ok(value) => self
                .store
                .upsert(&self.role_table, vec![value])
                .await
                .map_err(GatewayError::from),
            Err(e) => Err(GatewayError::from(e)),
        };

        match result {
            Ok(()) => {
                tracing::debug!("Assigned role {} to {}", role, user_id);
                true
            }
            Err(e) => {
                tracing::error!("Error assigning role: {}", e);
                false
            }
        }
    }

    /// The signed-in caller, provided they are an admin
    pub(crate) async fn require_admin(&self) -> Result<Uuid, GatewayError> {
        let caller = self
            .try_current_user()
            .await?
            .ok_or(GatewayError::NotAuthenticated)?;
        if !caller.role.is_admin() {
            return Err(GatewayError::permission_denied(ADMIN_ONLY_MESSAGE));
        }
        Ok(caller.id())
    }

    /// Give `user_id` the role `new_role`, if the caller is an admin.
    ///
    /// Returns `false` on any failure, including a non-admin caller.
    pub async fn update_user_role(&self, user_id: Uuid, new_role: Role) -> bool {
        match self.require_admin().await {
            Ok(admin_id) => {
                tracing::info!("Admin {} setting role {} on {}", admin_id, new_role, user_id);
                self.assign_role(user_id, &new_role).await
            }
            Err(e) => {
                tracing::error!("Error updating user role: {}", e);
                false
            }
        }
    }

    /// Delete the `(user_id, role)` row, if the caller is an admin.
    pub async fn remove_role(&self, user_id: Uuid, role: Role) -> bool {
        let result = async {
            self.require_admin().await?;
            let query = Query::table(&self.role_table)
                .eq("user_id", user_id)
                .eq("role", role.as_str());
            self.store.delete(&query).await?;
            Ok::<(), GatewayError>(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Removed role {} from {}", role, user_id);
                true
            }
            Err(e) => {
                tracing::error!("Error removing user role: {}", e);
                false
            }
        }
    }

    /// Existence query for the caller's `admin` row.
    ///
    /// `Ok(false)` without a session; backend failures stay errors.
    pub(crate) async fn check_admin(&self) -> Result<bool, GatewayError> {
        let user = match self.auth.get_session().await? {
            Some(session) => session.user,
            None => return Ok(false),
        };
        let query = Query::table(&self.role_table)
            .select("role")
            .eq("user_id", user.id)
            .eq("role", Role::Admin.as_str())
            .limit(1);
        let row = self.store.fetch_maybe_single(&query).await?;
        Ok(row.is_some())
    }

    /// Whether the caller holds an `admin` row.
    ///
    /// Checked with a direct existence query rather than role resolution;
    /// `false` without a session or on any error.
    pub async fn is_admin(&self) -> bool {
        self.check_admin().await.unwrap_or_else(|e| {
            tracing::error!("Error checking admin status: {}", e);
            false
        })
    }
}
