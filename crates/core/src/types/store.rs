//! Store (tienda) records as seen by the client.

use serde::{Deserialize, Serialize};

use super::{StoreId, UserId};

/// A store a user can own or join.
///
/// The staff PIN never leaves the backend; joining sends the PIN for
/// verification instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Backend store ID.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// Owner's user ID.
    pub owner_id: UserId,
    /// Contact email shown to customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone shown to customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Logo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Editable store details. `name` is required; empty contact fields are
/// sent as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    /// Display name.
    pub name: String,
    /// Contact email shown to customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone shown to customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Logo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl StoreSettings {
    /// Settings that rename the store and clear nothing else.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trim every field and drop blank optional ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |field: Option<String>| {
            field
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        Self {
            name: self.name.trim().to_owned(),
            email: clean(self.email),
            phone: clean(self.phone),
            image: clean(self.image),
        }
    }
}

/// A store search hit, with the owner's name for disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListing {
    /// The store.
    #[serde(rename = "tienda")]
    pub store: Store,
    /// Owner's display name.
    pub owner_name: String,
}
