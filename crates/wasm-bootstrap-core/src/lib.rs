//! Bootstrap manager for a WebAssembly-compiled inference engine.
//!
//! Probes the host for shared-memory threads and SIMD, selects the matching
//! binary variant, instantiates it once under an optional timeout, and
//! exposes the resulting module handle until it is disposed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wasm_bootstrap_core::{InitConfig, RuntimeManager, WasmtimeHost};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = RuntimeManager::new(Arc::new(WasmtimeHost::new()?));
//! let report = manager.initialize(&InitConfig::from_env()).await?;
//! println!("loaded {}", report.variant);
//!
//! let handle = manager.get_instance()?;
//! assert!(handle.is_live());
//!
//! manager.dispose();
//! assert!(!handle.is_live());
//! # Ok(())
//! # }
//! ```

pub mod global_runtime;
pub mod runtime;

pub use global_runtime::{
    dispose, get_instance, initialize_runtime, install_global_runtime, is_runtime_initialized,
    runtime_state, runtime_status_message,
};
pub use runtime::{
    select_variant, AbortCause, BuildFlags, CapabilityFlags, ComputeModule, HostError, HostResult,
    InitConfig, InstantiateRequest, Instantiated, LifecycleState, LoadReport, ModuleHandle,
    RuntimeError, RuntimeManager, RuntimeResult, VariantName, WasmHost, WasmPaths, WasmtimeHost,
    WasmtimeModule,
};
