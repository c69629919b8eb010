//! Core lifecycle machine storage.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::handle::ModuleHandle;
use crate::runtime::state::{AbortCause, LifecycleState};

/// State slot. The handle exists only in `Ready`.
#[derive(Debug)]
pub(super) enum Slot {
    Uninitialized,
    Initializing,
    Ready(Arc<ModuleHandle>),
    Aborted(AbortCause),
}

impl Slot {
    pub(super) fn state(&self) -> LifecycleState {
        match self {
            Self::Uninitialized => LifecycleState::Uninitialized,
            Self::Initializing => LifecycleState::Initializing,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Aborted(_) => LifecycleState::Aborted,
        }
    }
}

/// Sole arbiter of whether loading has already happened.
///
/// # Invariants
///
/// - At most one handle is stored, and only in `Ready`
/// - At most one initialization is in flight
/// - `Aborted` is never left
#[derive(Debug)]
pub struct LifecycleMachine {
    pub(super) slot: Mutex<Slot>,
}

impl LifecycleMachine {
    /// Create a machine in `Uninitialized`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Uninitialized),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.slot.lock().state()
    }

    /// Why the machine aborted, if it did.
    #[must_use]
    pub fn abort_cause(&self) -> Option<AbortCause> {
        match &*self.slot.lock() {
            Slot::Aborted(cause) => Some(cause.clone()),
            _ => None,
        }
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}
