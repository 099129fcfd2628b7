//! Contracts for the backend collaborators.
//!
//! The engine only knows these traits. [`crate::api::ApiClient`] implements
//! both against the REST backend; tests plug in scripted fakes.

use async_trait::async_trait;
use secrecy::SecretString;

use tienda_core::{Email, Identity, Role, Store, StoreId, StoreListing, StoreSettings, UserId};

use crate::error::{AuthError, StoreError};

/// A successful provider answer with the message to show alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<T> {
    /// Human-readable message from the provider.
    pub message: String,
    /// Payload.
    pub value: T,
}

impl<T> Reply<T> {
    /// Create a reply.
    #[must_use]
    pub fn new(message: impl Into<String>, value: T) -> Self {
        Self {
            message: message.into(),
            value,
        }
    }
}

/// Registration form data.
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Contact phone.
    pub phone: String,
    /// Email the verification code is sent to.
    pub email: Email,
    /// Chosen password.
    pub password: SecretString,
    /// Role, fixed for the lifetime of the account.
    pub role: Role,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("phone", &self.phone)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// What happened after a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A code was emailed; the account is usable once verified.
    ConfirmationRequired,
    /// The account is active; the user signs in from the login form.
    Registered,
    /// The account is active and the user is already signed in.
    SignedIn(Identity),
}

/// Credential checks, registration, verification and federated sign-in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Check a contact (email or phone) and password.
    async fn check_credentials(
        &self,
        contact: &str,
        password: &SecretString,
    ) -> Result<Reply<Identity>, AuthError>;

    /// Create an account.
    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Reply<RegistrationOutcome>, AuthError>;

    /// Confirm an account with the emailed code.
    async fn verify(&self, email: &Email, code: &str) -> Result<Reply<()>, AuthError>;

    /// Exchange a federated identity token for a signed-in identity.
    async fn federated_exchange(&self, token: &SecretString) -> Result<Reply<Identity>, AuthError>;
}

/// Store lookup, joining, creation and administration.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Search stores by name.
    async fn search_stores(&self, term: &str) -> Result<Vec<StoreListing>, StoreError>;

    /// Fetch one store.
    async fn store(&self, store_id: StoreId) -> Result<Store, StoreError>;

    /// Check a staff PIN. `Ok(false)` means the PIN was wrong.
    async fn verify_pin(&self, store_id: StoreId, pin: &SecretString) -> Result<bool, StoreError>;

    /// Associate `user_id` with `store_id`; returns the new snapshot.
    async fn assign_store(&self, user_id: UserId, store_id: StoreId)
    -> Result<Identity, StoreError>;

    /// Create a store owned by the signed-in user.
    async fn create_store(&self, name: &str) -> Result<Store, StoreError>;

    /// Current snapshot of `user_id` as the backend sees it.
    async fn fetch_identity(&self, user_id: UserId) -> Result<Identity, StoreError>;

    /// Replace the staff PIN of `store_id`.
    async fn update_pin(&self, store_id: StoreId, pin: &SecretString) -> Result<(), StoreError>;

    /// Replace the editable details of `store_id`.
    async fn update_settings(
        &self,
        store_id: StoreId,
        settings: &StoreSettings,
    ) -> Result<(), StoreError>;

    /// Users associated with `store_id`.
    async fn store_staff(&self, store_id: StoreId) -> Result<Vec<Identity>, StoreError>;
}
