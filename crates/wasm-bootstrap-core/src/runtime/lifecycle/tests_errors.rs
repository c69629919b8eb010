//! Error path tests for the lifecycle machine.

use super::*;
use crate::runtime::error::RuntimeError;
use crate::runtime::state::AbortCause;

#[test]
fn test_concurrent_begin_fails_fast() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    assert!(matches!(
        machine.begin_initialize(),
        Err(RuntimeError::AlreadyInitializing)
    ));
}

#[test]
fn test_begin_after_abort_fails() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    machine.mark_aborted(AbortCause::Failed("boom".into()));
    assert!(matches!(
        machine.begin_initialize(),
        Err(RuntimeError::PreviouslyAborted)
    ));
}

#[test]
fn test_handle_before_ready() {
    let machine = LifecycleMachine::new();
    assert!(matches!(machine.handle(), Err(RuntimeError::NotInitialized)));

    machine.begin_initialize().unwrap();
    assert!(matches!(machine.handle(), Err(RuntimeError::NotInitialized)));
}

#[test]
fn test_abort_from_uninitialized_is_refused() {
    let machine = LifecycleMachine::new();
    assert!(!machine.mark_aborted(AbortCause::Failed("early".into())));
    assert!(machine.abort_cause().is_none());
}

#[test]
fn test_begin_after_dispose_fails() {
    use crate::runtime::handle::ModuleHandle;
    use crate::runtime::tests::helpers::{sample_report, NullModule};

    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    machine
        .mark_ready(ModuleHandle::new(sample_report(), Box::new(NullModule::default()), None))
        .unwrap();
    machine.dispose();
    assert!(matches!(
        machine.begin_initialize(),
        Err(RuntimeError::PreviouslyAborted)
    ));
    assert!(matches!(machine.handle(), Err(RuntimeError::NotInitialized)));
}
