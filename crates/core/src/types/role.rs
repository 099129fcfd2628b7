//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected admin or vendedor)")]
pub struct RoleParseError(pub String);

/// The two fixed roles a user can register with.
///
/// The backend names them `admin` and `vendedor`; those names are used on
/// the wire and in persisted snapshots. A role never changes after
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Store owner. Creates and manages a store.
    #[serde(rename = "admin")]
    Owner,
    /// Store staff. Joins an existing store with its PIN.
    #[serde(rename = "vendedor")]
    Staff,
}

impl Role {
    /// The backend's name for this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "admin",
            Self::Staff => "vendedor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    /// Accepts the backend names as well as `owner` / `staff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Ok(Self::Owner),
            "vendedor" | "staff" => Ok(Self::Staff),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}
