//! Lifecycle State Machine
//!
//! Tracks the single module instance of a manager through
//! `Uninitialized -> Initializing -> Ready`, or `Initializing -> Aborted`,
//! and `Ready -> Aborted` on dispose.
//!
//! # Guarded Terminal Transitions
//!
//! [`LifecycleMachine::mark_ready`] and [`LifecycleMachine::mark_aborted`]
//! only act while the state is `Initializing`. From any other state they are
//! no-ops that report refusal, so the first terminal transition wins and a
//! late load result can never overwrite an outcome already reported to the
//! caller.
//!
//! ```text
//!   Uninitialized
//!        |
//!   begin_initialize()
//!        v
//!   Initializing ---mark_aborted()---> Aborted
//!        |                               ^
//!   mark_ready()                         |
//!        v                               |
//!      Ready ---------dispose()----------+
//! ```
//!
//! # Thread Safety
//!
//! All state lives behind one `parking_lot::Mutex`; every transition is a
//! single short critical section and never awaits while holding the lock.

mod core;
mod operations;

#[cfg(test)]
mod tests_errors;
#[cfg(test)]
mod tests_transitions;

pub use self::core::LifecycleMachine;
pub use self::operations::InitStart;
