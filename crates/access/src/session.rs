//! Session store: the single source of truth for who is signed in.
//!
//! The store is constructed explicitly and shared as `Arc<SessionStore>`.
//! Only the authentication flow and store onboarding write to it; the
//! access policy only ever sees read-only copies from [`SessionStore::current`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use tienda_core::Identity;

use crate::error::AuthError;
use crate::storage::{SnapshotStorage, StorageError};

/// Holds the current identity snapshot and its durable copy.
pub struct SessionStore {
    storage: Arc<dyn SnapshotStorage>,
    current: watch::Sender<Option<Identity>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("user_id", &self.current.borrow().as_ref().map(|i| i.user_id))
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Restore the session persisted by a previous run.
    ///
    /// A missing, unreadable or malformed payload starts the session
    /// anonymous. A malformed or corrupt payload is erased so the next start
    /// is clean.
    #[must_use]
    pub fn restore(storage: Arc<dyn SnapshotStorage>) -> Self {
        let restored = match storage.load() {
            Ok(Some(payload)) => match parse_snapshot(&payload) {
                Ok(identity) => {
                    info!(user_id = %identity.user_id, role = %identity.role, "Session restored");
                    Some(identity)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding stored session");
                    if let Err(e) = storage.erase() {
                        warn!(error = %e, "Failed to erase malformed session");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e @ StorageError::Corrupt { .. }) => {
                warn!(error = %e, "Discarding stored session");
                if let Err(e) = storage.erase() {
                    warn!(error = %e, "Failed to erase corrupt session");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "Could not read stored session, starting anonymous");
                None
            }
        };

        let (current, _) = watch::channel(restored);
        Self {
            storage,
            current,
            generation: AtomicU64::new(0),
        }
    }

    /// The signed-in identity, or `None` when anonymous.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Returns `true` if someone is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Replace the snapshot wholesale and persist it.
    ///
    /// Persisting is best effort: if the durable write fails the in-memory
    /// snapshot still wins for this process.
    pub fn set(&self, identity: Identity) {
        match serde_json::to_string(&identity) {
            Ok(payload) => {
                if let Err(e) = self.storage.save(&payload) {
                    warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize session"),
        }

        debug!(user_id = %identity.user_id, store_id = ?identity.store_id, "Session updated");
        self.current.send_replace(Some(identity));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Sign out: become anonymous and erase the durable copy.
    pub fn clear(&self) {
        if let Err(e) = self.storage.erase() {
            warn!(error = %e, "Failed to erase persisted session");
        }

        debug!("Session cleared");
        self.current.send_replace(None);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Receiver notified on every `set` and `clear`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    /// Counter bumped on every `set` and `clear`.
    ///
    /// Delayed actions capture it and compare before acting, so they never
    /// apply to a session that changed in the meantime.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

fn parse_snapshot(payload: &str) -> Result<Identity, AuthError> {
    serde_json::from_str(payload).map_err(|e| AuthError::MalformedStoredSession(e.to_string()))
}
