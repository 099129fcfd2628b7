//! Navigation sink.
//!
//! The engine never renders; it decides where to go and asks the
//! presentation layer to take the user there.

use std::sync::{Mutex, PoisonError};

use tienda_core::Destination;

/// Performs the actual screen transition.
pub trait Navigator: Send + Sync {
    /// Show `destination`.
    fn navigate(&self, destination: Destination);
}

/// Navigator that only remembers where it was sent.
///
/// Useful for headless front ends and for tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    /// Navigator with an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every destination navigated to, oldest first.
    #[must_use]
    pub fn visits(&self) -> Vec<Destination> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent destination.
    #[must_use]
    pub fn last(&self) -> Option<Destination> {
        self.visits().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination);
    }
}
