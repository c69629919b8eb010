//! Lifecycle state of the shared module instance.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of the single module instance owned by a manager.
///
/// ```text
/// Uninitialized --initialize()--> Initializing --mark_ready()----> Ready
///                                      |                            |
///                                 mark_aborted()                dispose()
///                                      v                            |
///                                   Aborted <-----------------------+
/// ```
///
/// `Aborted` is terminal: nothing leads back to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleState {
    /// No initialization attempt has been made.
    Uninitialized,
    /// A load is in flight.
    Initializing,
    /// The module handle is live and reachable.
    Ready,
    /// Initialization failed, timed out, or the runtime was disposed.
    Aborted,
}

impl LifecycleState {
    /// Check if a load is currently in flight.
    #[inline]
    #[must_use]
    pub fn is_initializing(&self) -> bool {
        matches!(self, Self::Initializing)
    }

    /// Check if the module handle is available.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if the state is terminal.
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Stable lowercase name, used in logs and status output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the lifecycle ended up in [`LifecycleState::Aborted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortCause {
    /// The host rejected the variant, or load preparation failed.
    Failed(String),
    /// The instantiation budget (milliseconds) was exceeded.
    TimedOut(u64),
    /// The Ready instance was disposed.
    Disposed,
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut(ms) => write!(f, "timed out after {ms}ms"),
            Self::Disposed => f.write_str("disposed"),
        }
    }
}
