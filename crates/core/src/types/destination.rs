//! Application areas and access decisions.

use serde::{Deserialize, Serialize};

/// One of the named application areas a user can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Home screen (product lookup and catalog).
    Landing,
    /// Login / registration screen.
    AuthGate,
    /// Store management for owners.
    AdminPanel,
    /// Store search and PIN entry for staff.
    JoinStore,
    /// First-store creation for owners.
    CreateStore,
}

impl Destination {
    /// Every destination, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Landing,
        Self::AuthGate,
        Self::AdminPanel,
        Self::JoinStore,
        Self::CreateStore,
    ];

    /// Route path for this destination.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Landing => "/home",
            Self::AuthGate => "/auth",
            Self::AdminPanel => "/admin",
            Self::JoinStore => "/join-store",
            Self::CreateStore => "/create-store",
        }
    }

    /// Normalize a requested route path.
    ///
    /// Query strings, fragments and slashes are ignored. The empty path and
    /// anything unrecognized normalize to [`Destination::Landing`].
    ///
    /// ```
    /// use tienda_core::Destination;
    ///
    /// assert_eq!(Destination::from_path("/admin/"), Destination::AdminPanel);
    /// assert_eq!(Destination::from_path("join-store?first-visit=true"), Destination::JoinStore);
    /// assert_eq!(Destination::from_path(""), Destination::Landing);
    /// assert_eq!(Destination::from_path("/no-such-page"), Destination::Landing);
    /// ```
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let route = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('/');

        match route {
            "auth" => Self::AuthGate,
            "admin" => Self::AdminPanel,
            "join-store" => Self::JoinStore,
            "create-store" => Self::CreateStore,
            _ => Self::Landing,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of an access check: proceed, or go somewhere else instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum Decision {
    /// The requested destination may be shown.
    Allow,
    /// The requested destination must not be shown; go here instead.
    Redirect(Destination),
}

impl Decision {
    /// The destination that ends up on screen when `requested` was asked for.
    #[must_use]
    pub const fn resolve(self, requested: Destination) -> Destination {
        match self {
            Self::Allow => requested,
            Self::Redirect(to) => to,
        }
    }

    /// Returns `true` for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}
