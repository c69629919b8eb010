//! Tests for RuntimeManager initialize / get_instance / dispose.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::helpers::{no_optional_builds, InstantiateBehavior, ScriptedHost};
use crate::runtime::config::{InitConfig, WasmPaths};
use crate::runtime::error::{HostError, RuntimeError};
use crate::runtime::manager::RuntimeManager;
use crate::runtime::state::{AbortCause, LifecycleState};
use crate::runtime::variant::VariantName;

fn manager_for(host: &Arc<ScriptedHost>) -> RuntimeManager {
    let host: Arc<ScriptedHost> = Arc::clone(host);
    RuntimeManager::new(host)
        .with_build_flags(no_optional_builds())
        .with_script_directory("/test/")
}

fn threaded_config() -> InitConfig {
    InitConfig {
        num_threads: 4,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_get_instance_before_initialize() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);

    assert!(matches!(manager.get_instance(), Err(RuntimeError::NotInitialized)));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);
    assert_eq!(manager.status_message(), "Not initialized");
}

#[tokio::test]
async fn test_concurrent_initialize_fails_fast() {
    let host = ScriptedHost::capable()
        .with_instantiate(InstantiateBehavior::Succeed {
            delay: std::time::Duration::from_millis(50),
        })
        .into_shared();
    let manager = manager_for(&host);
    let config = threaded_config();

    let (first, second) = tokio::join!(manager.initialize(&config), manager.initialize(&config));

    let outcomes = [first, second];
    let ok = outcomes.iter().filter(|r| r.is_ok()).count();
    let busy = outcomes
        .iter()
        .filter(|r| matches!(r, Err(RuntimeError::AlreadyInitializing)))
        .count();
    assert_eq!((ok, busy), (1, 1));
    assert_eq!(host.instantiate_calls(), 1);
    assert!(manager.is_ready());
}

#[tokio::test]
async fn test_initialize_when_ready_is_noop() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);

    let first = manager.initialize(&InitConfig::default()).await.unwrap();
    let instance = manager.get_instance().unwrap();
    let second = manager.initialize(&InitConfig::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(host.instantiate_calls(), 1);
    assert_eq!(manager.get_instance().unwrap().instance_id(), instance.instance_id());
}

#[tokio::test]
async fn test_threaded_load_request() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);
    let config = InitConfig {
        num_threads: 4,
        wasm_paths: Some(WasmPaths::Prefix("/assets/".into())),
        ..Default::default()
    };

    let report = manager.initialize(&config).await.unwrap();
    assert_eq!(report.variant, VariantName::SIMD_THREADED);
    assert!(report.threaded);
    assert_eq!(report.num_threads, Some(4));

    assert_eq!(
        host.fetched_locations(),
        vec!["/assets/ort-wasm-simd-threaded.worker.js".to_string()]
    );
    let request = host.last_request().unwrap();
    assert_eq!(request.num_threads, Some(4));
    assert_eq!(
        request.main_script_url.as_deref(),
        Some("/assets/ort-wasm-simd-threaded.mjs")
    );
    let worker = request.worker_bootstrap.unwrap();
    assert_eq!(worker.file_name, "ort-wasm-simd-threaded.worker.js");
    assert!(!worker.bytes.is_empty());

    assert_eq!(manager.get_instance().unwrap().worker_count(), 4);
}

#[tokio::test]
async fn test_single_threaded_load_skips_worker_prefetch() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);

    let report = manager
        .initialize(&InitConfig { num_threads: 1, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(report.variant, VariantName::SIMD);
    assert_eq!(report.wasm_location, "/test/ort-wasm-simd.wasm");
    assert!(host.fetched_locations().is_empty());
    let request = host.last_request().unwrap();
    assert!(request.num_threads.is_none());
    assert!(request.main_script_url.is_none());
    assert_eq!(manager.get_instance().unwrap().worker_count(), 0);
}

#[tokio::test]
async fn test_instantiation_failure_aborts() {
    let host = ScriptedHost::capable()
        .with_instantiate(InstantiateBehavior::Fail)
        .into_shared();
    let manager = manager_for(&host);

    let err = manager.initialize(&threaded_config()).await.unwrap_err();
    match &err {
        RuntimeError::InitFailed { variant, source } => {
            assert_eq!(variant, "ort-wasm-simd-threaded");
            assert!(matches!(source, HostError::Instantiate { .. }));
        }
        other => panic!("Expected InitFailed, got {:?}", other),
    }
    assert!(err.is_retryable_with_fallback());
    assert_eq!(manager.state(), LifecycleState::Aborted);
    assert!(matches!(manager.abort_cause(), Some(AbortCause::Failed(_))));

    assert!(matches!(
        manager.initialize(&threaded_config()).await,
        Err(RuntimeError::PreviouslyAborted)
    ));
    assert_eq!(host.instantiate_calls(), 1);
}

#[tokio::test]
async fn test_worker_prefetch_failure_aborts() {
    let host = ScriptedHost::capable().with_failing_fetch().into_shared();
    let manager = manager_for(&host);

    let err = manager.initialize(&threaded_config()).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InitFailed {
            source: HostError::AssetUnavailable { .. },
            ..
        }
    ));
    assert_eq!(manager.state(), LifecycleState::Aborted);
    assert_eq!(host.instantiate_calls(), 0);
}

#[tokio::test]
async fn test_invalid_config_leaves_state_untouched() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);
    let bad = InitConfig {
        wasm_paths: Some(WasmPaths::Prefix(String::new())),
        ..Default::default()
    };

    assert!(matches!(
        manager.initialize(&bad).await,
        Err(RuntimeError::InvalidConfig { .. })
    ));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    manager.initialize(&InitConfig::default()).await.unwrap();
    assert!(manager.is_ready());
}

#[tokio::test]
async fn test_dispose_then_get_instance() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);
    manager
        .initialize(&InitConfig { num_threads: 2, ..Default::default() })
        .await
        .unwrap();

    let handle = manager.get_instance().unwrap();
    assert_eq!(handle.worker_count(), 2);
    assert!(manager.status_message().starts_with("Ready (ort-wasm-simd-threaded"));

    assert!(manager.dispose());
    assert!(matches!(manager.get_instance(), Err(RuntimeError::NotInitialized)));
    assert!(!handle.is_live());
    assert!(handle.module().is_err());
    assert_eq!(handle.worker_count(), 0);

    // Second dispose is a no-op.
    assert!(!manager.dispose());
    assert_eq!(manager.status_message(), "Aborted: disposed");

    // Disposal is terminal.
    assert!(matches!(
        manager.initialize(&InitConfig::default()).await,
        Err(RuntimeError::PreviouslyAborted)
    ));
}

#[tokio::test]
async fn test_dispose_before_initialize_is_noop() {
    let host = ScriptedHost::capable().into_shared();
    let manager = manager_for(&host);

    assert!(!manager.dispose());
    assert_eq!(manager.state(), LifecycleState::Uninitialized);
    manager.initialize(&InitConfig::default()).await.unwrap();
    assert!(manager.is_ready());
}

#[tokio::test]
async fn test_probe_capabilities_does_not_touch_lifecycle() {
    let host = ScriptedHost::capable().with_shared_memory(false).into_shared();
    let manager = manager_for(&host);

    let flags = manager.probe_capabilities(4);
    assert!(!flags.threads_supported);
    assert!(flags.simd_supported);
    assert_eq!(manager.state(), LifecycleState::Uninitialized);
}

#[tokio::test]
async fn test_slow_shared_memory_check_leaves_runtime_responsive() {
    let host = ScriptedHost::capable()
        .with_transfer_delay(Duration::from_millis(300))
        .into_shared();
    let manager = manager_for(&host);

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(10));
            loop {
                interval.tick().await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    manager.initialize(&threaded_config()).await.unwrap();
    ticker.abort();

    assert_eq!(host.transfer_calls(), 1);
    let advanced = ticks.load(Ordering::SeqCst);
    assert!(advanced >= 10, "ticker advanced only {advanced} times during capability detection");
}
