//! Session inspection.

use tracing::info;

use tienda_access::{RouteGuard, policy};
use tienda_core::Decision;

use super::Context;

/// Report the signed-in user and where they would land.
pub fn status(context: &Context) {
    let identity = context.session.current();
    let landing = policy::landing(identity.as_ref());

    match identity {
        Some(identity) => info!(
            user_id = %identity.user_id,
            name = %identity.name,
            role = %identity.role,
            store_id = ?identity.store_id,
            landing = %landing,
            "Signed in"
        ),
        None => info!(landing = %landing, "Not signed in"),
    }
}

/// Ask the route guard about `path` and report the outcome.
pub fn route(context: &Context, path: &str) {
    let guard = RouteGuard::new(context.session.clone(), context.navigator.clone());
    match guard.check(path) {
        Decision::Allow => info!(path, "Allowed"),
        Decision::Redirect(to) => info!(path, redirect = %to, "Redirected"),
    }
    guard.navigate(path);
}
