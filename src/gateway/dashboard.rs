/**
 * Admin Dashboard Data
 *
 * Builds the merged per-user view shown on the admin dashboard and backs its
 * two actions, granting and revoking `admin`. Rendering is left to the
 * embedding application.
 *
 * # Consistency
 *
 * The view is assembled from two independent reads, profiles first and role
 * rows second. A role change landing between them shows up in the role
 * column of a profile read before it; nothing here detects or prevents that.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::gateway::roles::ADMIN_ONLY_MESSAGE;
use crate::gateway::SessionGateway;
use crate::provider::Query;
use crate::shared::error::GatewayError;
use crate::shared::role::Role;
use crate::shared::types::{OperationResult, Profile, RoleAssignment};

/// One dashboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub profile: Profile,
    /// Every role row of the user, in table order
    pub roles: Vec<Role>,
    pub effective_role: Role,
    pub is_admin: bool,
}

/// Everything the dashboard needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdminDashboard {
    pub entries: Vec<DashboardEntry>,
}

impl AdminDashboard {
    /// Merge profiles with role rows.
    ///
    /// Role rows without a profile are ignored; profiles without role rows
    /// get the default role.
    pub fn assemble(profiles: Vec<Profile>, assignments: Vec<RoleAssignment>) -> Self {
        let mut by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for assignment in assignments {
            by_user
                .entry(assignment.user_id)
                .or_default()
                .push(assignment.role);
        }

        let entries = profiles
            .into_iter()
            .map(|profile| {
                let roles = by_user.remove(&profile.id).unwrap_or_default();
                let effective_role = Role::highest(roles.iter().cloned()).unwrap_or_default();
                let is_admin = roles.iter().any(Role::is_admin);
                DashboardEntry {
                    profile,
                    roles,
                    effective_role,
                    is_admin,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn admins(&self) -> impl Iterator<Item = &DashboardEntry> {
        self.entries.iter().filter(|entry| entry.is_admin)
    }
}

fn decode_rows<T: serde::de::DeserializeOwned>(
    rows: Vec<serde_json::Value>,
) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(GatewayError::from))
        .collect()
}

impl SessionGateway {
    /// Load the dashboard view; admins only.
    pub async fn load_admin_dashboard(&self) -> OperationResult<AdminDashboard> {
        let result = async {
            if !self.check_admin().await? {
                return Err(GatewayError::permission_denied("admin role required"));
            }

            let profiles = self
                .store
                .select(
                    &Query::table(&self.profile_table)
                        .select("id,email,display_name,avatar_url"),
                )
                .await?;
            let assignments = self
                .store
                .select(&Query::table(&self.role_table).select("user_id,role"))
                .await?;

            Ok(AdminDashboard::assemble(
                decode_rows(profiles)?,
                decode_rows(assignments)?,
            ))
        }
        .await;

        if let Err(e) = &result {
            tracing::error!("Error loading admin dashboard: {}", e);
        }
        result.into()
    }

    /// Dashboard "make admin" action
    pub async fn grant_admin(&self, user_id: Uuid) -> bool {
        self.update_user_role(user_id, Role::Admin).await
    }

    /// Dashboard "remove admin" action: deletes the `(user_id, 'admin')` row.
    pub async fn revoke_admin(&self, user_id: Uuid) -> bool {
        match self.check_admin().await {
            Ok(true) => self.remove_role(user_id, Role::Admin).await,
            Ok(false) => {
                tracing::error!(
                    "Error removing admin: {}",
                    GatewayError::permission_denied(ADMIN_ONLY_MESSAGE)
                );
                false
            }
            Err(e) => {
                tracing::error!("Error removing admin: {}", e);
                false
            }
        }
    }
}
