//! State transition operations for the lifecycle machine.
//!
//! - `begin_initialize`: Uninitialized -> Initializing
//! - `mark_ready`: Initializing -> Ready
//! - `mark_aborted`: Initializing -> Aborted
//! - `dispose`: Ready -> Aborted

use std::sync::Arc;

use tracing::{debug, warn};

use super::core::{LifecycleMachine, Slot};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::handle::ModuleHandle;
use crate::runtime::state::AbortCause;

/// Outcome of [`LifecycleMachine::begin_initialize`].
#[derive(Debug)]
pub enum InitStart {
    /// The machine moved to `Initializing`; the caller must drive the load
    /// to a terminal transition.
    Started,
    /// The machine was already `Ready`; nothing to do.
    AlreadyReady(Arc<ModuleHandle>),
}

impl LifecycleMachine {
    /// Claim the right to load.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::AlreadyInitializing`] if a load is in flight
    /// - [`RuntimeError::PreviouslyAborted`] if the machine aborted
    ///
    /// # State Transition
    ///
    /// `Uninitialized` -> `Initializing`; `Ready` is left untouched.
    pub fn begin_initialize(&self) -> RuntimeResult<InitStart> {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Uninitialized => {
                *slot = Slot::Initializing;
                debug!("Lifecycle: uninitialized -> initializing");
                Ok(InitStart::Started)
            }
            Slot::Initializing => Err(RuntimeError::AlreadyInitializing),
            Slot::Ready(handle) => Ok(InitStart::AlreadyReady(Arc::clone(handle))),
            Slot::Aborted(_) => Err(RuntimeError::PreviouslyAborted),
        }
    }

    /// Store the loaded handle.
    ///
    /// Only valid from `Initializing`. From any other state the handle is
    /// refused and handed back so the caller can release it.
    ///
    /// # State Transition
    ///
    /// `Initializing` -> `Ready`
    pub fn mark_ready(&self, handle: ModuleHandle) -> Result<Arc<ModuleHandle>, ModuleHandle> {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Initializing => {
                let handle = Arc::new(handle);
                *slot = Slot::Ready(Arc::clone(&handle));
                debug!(instance_id = %handle.instance_id(), "Lifecycle: initializing -> ready");
                Ok(handle)
            }
            other => {
                warn!(
                    state = %other.state(),
                    instance_id = %handle.instance_id(),
                    "Refusing ready transition outside of initializing"
                );
                Err(handle)
            }
        }
    }

    /// Record a failed load.
    ///
    /// Only valid from `Initializing`. Returns `false` (and changes nothing)
    /// from any other state.
    ///
    /// # State Transition
    ///
    /// `Initializing` -> `Aborted`
    pub fn mark_aborted(&self, cause: AbortCause) -> bool {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Initializing => {
                debug!(cause = %cause, "Lifecycle: initializing -> aborted");
                *slot = Slot::Aborted(cause);
                true
            }
            other => {
                debug!(state = %other.state(), cause = %cause, "Ignoring abort outside of initializing");
                false
            }
        }
    }

    /// The Ready handle.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotInitialized`] unless the state is `Ready`.
    pub fn handle(&self) -> RuntimeResult<Arc<ModuleHandle>> {
        match &*self.slot.lock() {
            Slot::Ready(handle) => Ok(Arc::clone(handle)),
            _ => Err(RuntimeError::NotInitialized),
        }
    }

    /// Tear down the Ready instance.
    ///
    /// Terminates the handle's workers and revokes every outstanding clone.
    /// Returns the number of workers signalled, or `None` when the state was
    /// not `Ready` (no-op).
    ///
    /// # State Transition
    ///
    /// `Ready` -> `Aborted`
    pub fn dispose(&self) -> Option<usize> {
        let handle = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Uninitialized) {
                Slot::Ready(handle) => {
                    *slot = Slot::Aborted(AbortCause::Disposed);
                    handle
                }
                other => {
                    *slot = other;
                    return None;
                }
            }
        };
        debug!(instance_id = %handle.instance_id(), "Lifecycle: ready -> aborted (disposed)");
        Some(handle.release())
    }
}
