//! Route guard: applies the access policy to navigation attempts.

use std::sync::Arc;

use tracing::debug;

use tienda_core::{Decision, Destination};

use crate::navigation::Navigator;
use crate::policy;
use crate::session::SessionStore;

/// Intercepts navigation attempts and sends users where they belong.
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    /// Create a guard reading from `session` and navigating through `navigator`.
    #[must_use]
    pub fn new(session: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Decide a requested route path for the current session.
    #[must_use]
    pub fn check(&self, path: &str) -> Decision {
        let requested = Destination::from_path(path);
        let identity = self.session.current();
        policy::decide(identity.as_ref(), requested)
    }

    /// Navigate to `path`, or wherever the policy redirects it.
    ///
    /// Returns the destination actually shown.
    pub fn navigate(&self, path: &str) -> Destination {
        let requested = Destination::from_path(path);
        let decision = self.check(path);
        let shown = decision.resolve(requested);

        if let Decision::Redirect(to) = decision {
            debug!(requested = %requested, redirect = %to, "Navigation redirected");
        }

        self.navigator.navigate(shown);
        shown
    }
}
