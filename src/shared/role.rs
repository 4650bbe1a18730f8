//! Role hierarchy
//!
//! Roles are stored as plain strings in the `user_roles` table. Three of them
//! are known and ordered: `admin` > `editor` > `user`. Anything else read back
//! from the table is kept verbatim as [`Role::Unrecognized`] and carries no
//! rank, so it never satisfies an access check.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A role string resolved against the static hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Default role for every identity without an assignment
    #[default]
    User,
    /// Content editor
    Editor,
    /// Full access, including role management
    Admin,
    /// A stored role string outside the hierarchy
    Unrecognized(String),
}

impl Role {
    /// Known roles, lowest rank first
    pub const KNOWN: [Role; 3] = [Role::User, Role::Editor, Role::Admin];

    /// Rank in the hierarchy (`admin:3, editor:2, user:1`).
    ///
    /// Unrecognized roles have no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Role::Admin => Some(3),
            Role::Editor => Some(2),
            Role::User => Some(1),
            Role::Unrecognized(_) => None,
        }
    }

    /// Whether this role satisfies `required`.
    ///
    /// Both sides must have a rank; a missing rank on either side denies.
    pub fn dominates(&self, required: &Role) -> bool {
        match (self.rank(), required.rank()) {
            (Some(have), Some(need)) => have >= need,
            _ => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// The string stored in the `role` column
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Editor => "editor",
            Role::Admin => "admin",
            Role::Unrecognized(raw) => raw.as_str(),
        }
    }

    /// Picks the highest-ranked role out of a set of assignments.
    ///
    /// Ranked roles beat unrecognized ones; with only unrecognized roles the
    /// first one is returned. `None` for an empty iterator.
    pub fn highest<I>(roles: I) -> Option<Role>
    where
        I: IntoIterator<Item = Role>,
    {
        roles.into_iter().fold(None, |best, role| match best {
            None => Some(role),
            Some(current) => {
                if role.rank() > current.rank() {
                    Some(role)
                } else {
                    Some(current)
                }
            }
        })
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        match raw {
            "user" => Role::User,
            "editor" => Role::Editor,
            "admin" => Role::Admin,
            other => Role::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "user" | "editor" | "admin" => Role::from(raw.as_str()),
            _ => Role::Unrecognized(raw),
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::from(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::from(raw))
    }
}
