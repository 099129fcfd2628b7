//! Tienda Access - session and access-control engine.
//!
//! Decides which application area a user may see, keeps the signed-in
//! identity across restarts, and drives sign-in to a consistent landing page.
//!
//! # Architecture
//!
//! - [`session`] - Single source of truth for who is signed in
//! - [`storage`] - Durable local storage for the session snapshot
//! - [`policy`] - The one access decision table, pure and total
//! - [`guard`] - Route guard that applies the policy to navigation attempts
//! - [`flow`] - Login / registration / verification / federated sign-in state machine
//! - [`onboarding`] - Joining or creating a store after sign-in
//! - [`provider`] - Contracts for the backend collaborators
//! - [`api`] - REST implementation of the provider contracts
//! - [`config`] - Environment configuration
//!
//! The guard and the authentication flow both call [`policy::decide`]; there
//! is no second copy of the decision logic anywhere in the crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod guard;
pub mod navigation;
pub mod onboarding;
pub mod policy;
pub mod provider;
pub mod session;
pub mod storage;

mod in_flight;

pub use api::ApiClient;
pub use config::{AccessConfig, ConfigError};
pub use error::{AuthError, FlowError, StoreError};
pub use flow::{
    AuthFlow, AuthView, Feedback, FlowState, FlowTimings, Transition, VerificationTicket,
};
pub use guard::RouteGuard;
pub use navigation::{Navigator, RecordingNavigator};
pub use onboarding::StoreOnboarding;
pub use provider::{AuthProvider, Registration, RegistrationOutcome, Reply, StoreProvider};
pub use session::SessionStore;
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError};
