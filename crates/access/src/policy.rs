//! Access policy: the one decision table.
//!
//! Both the route guard and the post-login redirect go through [`decide`],
//! so the two can never disagree about where a user belongs.

use tienda_core::{Decision, Destination, Identity, Standing};

/// Decide whether `identity` may see `requested`, and where to go otherwise.
///
/// Pure and total: no I/O, no state, every input gets exactly one decision.
///
/// | identity | requested | decision |
/// |---|---|---|
/// | anonymous | any | redirect to `AuthGate` |
/// | owner, no store | `CreateStore` | allow |
/// | owner, no store | other | redirect to `CreateStore` |
/// | owner, store | `JoinStore`, `CreateStore` | redirect to `AdminPanel` |
/// | owner, store | other | allow |
/// | staff, no store | `JoinStore` | allow |
/// | staff, no store | other | redirect to `JoinStore` |
/// | staff, store | `AdminPanel` | redirect to `Landing` |
/// | staff, store | other | allow |
#[must_use]
pub fn decide(identity: Option<&Identity>, requested: Destination) -> Decision {
    let Some(identity) = identity else {
        return Decision::Redirect(Destination::AuthGate);
    };

    match (identity.standing(), requested) {
        (Standing::OwnerWithoutStore, Destination::CreateStore)
        | (Standing::StaffWithoutStore, Destination::JoinStore) => Decision::Allow,
        (Standing::OwnerWithoutStore, _) => Decision::Redirect(Destination::CreateStore),
        (Standing::StaffWithoutStore, _) => Decision::Redirect(Destination::JoinStore),
        (Standing::OwnerWithStore(_), Destination::JoinStore | Destination::CreateStore) => {
            Decision::Redirect(Destination::AdminPanel)
        }
        (Standing::StaffWithStore(_), Destination::AdminPanel) => {
            Decision::Redirect(Destination::Landing)
        }
        (Standing::OwnerWithStore(_) | Standing::StaffWithStore(_), _) => Decision::Allow,
    }
}

/// Where `identity` ends up when it asks for `requested`.
#[must_use]
pub fn resolve(identity: Option<&Identity>, requested: Destination) -> Destination {
    decide(identity, requested).resolve(requested)
}

/// Landing destination right after sign-in.
#[must_use]
pub fn landing(identity: Option<&Identity>) -> Destination {
    resolve(identity, Destination::Landing)
}
