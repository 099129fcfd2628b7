//! Core types for Tienda.
//!
//! This module provides type-safe wrappers for the session and access domain.

pub mod destination;
pub mod email;
pub mod id;
pub mod identity;
pub mod role;
pub mod store;

pub use destination::{Decision, Destination};
pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, Standing};
pub use role::{Role, RoleParseError};
pub use store::{Store, StoreListing, StoreSettings};
