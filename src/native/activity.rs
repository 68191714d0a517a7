//! Foreground context provider
//!
//! Launching a billing flow needs a foreground activity to host the store UI.
//! The host runtime owns that context; the bridge only asks for it.

use std::sync::{Mutex, PoisonError};

/// Opaque handle to a foreground activity/window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    name: String,
}

impl Activity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Source of the current foreground activity
pub trait ForegroundContextProvider: Send + Sync {
    /// The activity currently in the foreground, if any
    fn current_activity(&self) -> Option<Activity>;
}

/// Foreground provider backed by a settable slot
///
/// The host updates the slot as activities come and go.
#[derive(Debug, Default)]
pub struct ForegroundSlot {
    current: Mutex<Option<Activity>>,
}

impl ForegroundSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity(activity: Activity) -> Self {
        Self {
            current: Mutex::new(Some(activity)),
        }
    }

    pub fn set(&self, activity: Activity) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(activity);
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl ForegroundContextProvider for ForegroundSlot {
    fn current_activity(&self) -> Option<Activity> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
