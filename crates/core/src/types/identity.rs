//! Identity snapshot of the signed-in user.
//!
//! An [`Identity`] is what the session store holds while someone is signed in;
//! anonymity is the absence of one (`Option<Identity>`), so a role or store
//! can never exist without a user. Snapshots are replaced wholesale when the
//! store association changes - use [`Identity::with_store`] to derive the
//! replacement.

use serde::{Deserialize, Serialize};

use super::{Email, Role, StoreId, UserId};

/// Signed-in user, their role and store association.
///
/// Field names on the wire follow the backend's user record
/// (`id`, `tiendaId`, `registrationDate`), so a login response can be stored
/// and restored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Backend user ID.
    #[serde(rename = "id")]
    pub user_id: UserId,
    /// Role chosen at registration.
    pub role: Role,
    /// Store the user currently belongs to, if any.
    #[serde(rename = "tiendaId", default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<StoreId>,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Email,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Registration date as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
}

/// The four decision-relevant states of a signed-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standing {
    /// Owner who has not created a store yet.
    OwnerWithoutStore,
    /// Owner managing a store.
    OwnerWithStore(StoreId),
    /// Staff who has not joined a store yet.
    StaffWithoutStore,
    /// Staff working in a store.
    StaffWithStore(StoreId),
}

impl Identity {
    /// Create a snapshot without a store association or optional profile fields.
    #[must_use]
    pub fn new(user_id: UserId, role: Role, name: impl Into<String>, email: Email) -> Self {
        Self {
            user_id,
            role,
            store_id: None,
            name: name.into(),
            email,
            phone: None,
            registration_date: None,
        }
    }

    /// Role and store association folded into one value.
    #[must_use]
    pub const fn standing(&self) -> Standing {
        match (self.role, self.store_id) {
            (Role::Owner, None) => Standing::OwnerWithoutStore,
            (Role::Owner, Some(store)) => Standing::OwnerWithStore(store),
            (Role::Staff, None) => Standing::StaffWithoutStore,
            (Role::Staff, Some(store)) => Standing::StaffWithStore(store),
        }
    }

    /// Returns `true` if the user belongs to a store.
    #[must_use]
    pub const fn has_store(&self) -> bool {
        self.store_id.is_some()
    }

    /// A replacement snapshot associated with `store_id`.
    #[must_use]
    pub fn with_store(&self, store_id: StoreId) -> Self {
        Self {
            store_id: Some(store_id),
            ..self.clone()
        }
    }
}
