//! State transition tests for the lifecycle machine.

use super::*;
use crate::runtime::handle::ModuleHandle;
use crate::runtime::state::{AbortCause, LifecycleState};
use crate::runtime::tests::helpers::{sample_report, NullModule};
use crate::runtime::worker_pool::WorkerPool;

fn test_handle() -> ModuleHandle {
    ModuleHandle::new(sample_report(), Box::new(NullModule::default()), None)
}

#[test]
fn test_uninitialized_to_ready() {
    let machine = LifecycleMachine::new();
    assert_eq!(machine.state(), LifecycleState::Uninitialized);

    assert!(matches!(machine.begin_initialize().unwrap(), InitStart::Started));
    assert_eq!(machine.state(), LifecycleState::Initializing);

    let stored = machine.mark_ready(test_handle()).unwrap();
    assert_eq!(machine.state(), LifecycleState::Ready);
    assert_eq!(machine.handle().unwrap().instance_id(), stored.instance_id());
}

#[test]
fn test_initialize_when_ready_returns_stored_handle() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    let stored = machine.mark_ready(test_handle()).unwrap();

    match machine.begin_initialize().unwrap() {
        InitStart::AlreadyReady(handle) => assert_eq!(handle.instance_id(), stored.instance_id()),
        InitStart::Started => panic!("Ready machine must not restart loading"),
    }
    assert_eq!(machine.state(), LifecycleState::Ready);
}

#[test]
fn test_initializing_to_aborted() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    assert!(machine.mark_aborted(AbortCause::Failed("rejected".into())));
    assert_eq!(machine.state(), LifecycleState::Aborted);
    assert_eq!(machine.abort_cause(), Some(AbortCause::Failed("rejected".into())));
}

#[test]
fn test_first_terminal_transition_wins() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    assert!(machine.mark_aborted(AbortCause::TimedOut(1)));

    // Late success after the timeout was reported.
    let late = machine.mark_ready(test_handle()).unwrap_err();
    assert_eq!(machine.state(), LifecycleState::Aborted);
    assert_eq!(machine.abort_cause(), Some(AbortCause::TimedOut(1)));
    late.release();
    assert!(!late.is_live());

    // A second abort does not overwrite the cause.
    assert!(!machine.mark_aborted(AbortCause::Failed("late".into())));
    assert_eq!(machine.abort_cause(), Some(AbortCause::TimedOut(1)));
}

#[test]
fn test_abort_refused_once_ready() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    machine.mark_ready(test_handle()).unwrap();
    assert!(!machine.mark_aborted(AbortCause::TimedOut(5)));
    assert_eq!(machine.state(), LifecycleState::Ready);
}

#[test]
fn test_dispose_is_terminal_and_revokes_clones() {
    let machine = LifecycleMachine::new();
    machine.begin_initialize().unwrap();
    let pool = WorkerPool::spawn(2, "dispose-test").unwrap();
    let handle = ModuleHandle::new(sample_report(), Box::new(NullModule::default()), Some(pool));
    let outstanding = machine.mark_ready(handle).unwrap();

    assert_eq!(machine.dispose(), Some(2));
    assert_eq!(machine.state(), LifecycleState::Aborted);
    assert_eq!(machine.abort_cause(), Some(AbortCause::Disposed));
    assert!(!outstanding.is_live());
    assert_eq!(outstanding.worker_count(), 0);

    assert_eq!(machine.dispose(), None);
}

#[test]
fn test_dispose_is_noop_outside_ready() {
    let machine = LifecycleMachine::new();
    assert_eq!(machine.dispose(), None);
    assert_eq!(machine.state(), LifecycleState::Uninitialized);

    machine.begin_initialize().unwrap();
    assert_eq!(machine.dispose(), None);
    assert_eq!(machine.state(), LifecycleState::Initializing);
}
