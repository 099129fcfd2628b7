//! Error types for the access engine.
//!
//! Every error here is recoverable: each carries a message that can be shown
//! to the user, and none of them leaves a component in an undefined state.

use thiserror::Error;

/// Failures reported by the authentication provider or the session restore.
///
/// Provider variants carry the provider's own message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Wrong contact/password or rejected federated token.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Email or phone already registered.
    #[error("{0}")]
    DuplicateRegistration(String),

    /// Verification code rejected.
    #[error("{0}")]
    InvalidVerificationCode(String),

    /// Network or transport failure talking to the provider.
    #[error("{0}")]
    ProviderUnavailable(String),

    /// Persisted session snapshot could not be parsed.
    #[error("stored session is malformed: {0}")]
    MalformedStoredSession(String),
}

impl AuthError {
    /// Message suitable for display.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Errors returned by the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Another submission is still in flight.
    #[error("a request is already in progress")]
    Busy,

    /// The submission does not apply to the current state.
    #[error("{action} is not available while {state}")]
    InvalidState {
        /// The rejected action.
        action: &'static str,
        /// Name of the current state.
        state: &'static str,
    },

    /// Input was blank or malformed; the provider was not contacted.
    #[error("{0}")]
    InvalidInput(String),

    /// The provider rejected the request or could not be reached.
    #[error(transparent)]
    Provider(#[from] AuthError),
}

/// Errors returned by store onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Onboarding requires a signed-in user.
    #[error("sign in before choosing a store")]
    NotSignedIn,

    /// Only the owner of a store may administer it.
    #[error("only the store owner can manage this store")]
    Forbidden,

    /// The staff PIN did not match.
    #[error("PIN incorrecto. Inténtalo de nuevo.")]
    InvalidPin,

    /// Input was blank or malformed; the provider was not contacted.
    #[error("{0}")]
    InvalidInput(String),

    /// Another store request is still in flight.
    #[error("a request is already in progress")]
    Busy,

    /// The store does not exist.
    #[error("store not found")]
    NotFound,

    /// The provider rejected the request or could not be reached.
    #[error("{0}")]
    Unavailable(String),
}
