//! Process-wide runtime accessors.
//!
//! Thin wrappers over one [`RuntimeManager`] stored in a `OnceLock`. The
//! manager is created on first use with a [`WasmtimeHost`], unless the
//! application installed its own with [`install_global_runtime`] first.
//!
//! # Usage
//!
//! ```rust,ignore
//! // At startup
//! initialize_runtime(&InitConfig::from_env()).await?;
//!
//! // Anywhere that needs the module
//! let handle = get_instance()?;
//!
//! // At shutdown
//! dispose();
//! ```
//!
//! Disposal is terminal: a disposed process cannot initialize again.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::runtime::config::InitConfig;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::handle::ModuleHandle;
use crate::runtime::host::WasmtimeHost;
use crate::runtime::loader::LoadReport;
use crate::runtime::manager::RuntimeManager;
use crate::runtime::state::LifecycleState;

/// The single process-wide manager.
static GLOBAL_RUNTIME: OnceLock<RuntimeManager> = OnceLock::new();

/// Install `manager` as the process-wide runtime.
///
/// # Errors
///
/// Hands `manager` back if a global runtime already exists.
pub fn install_global_runtime(manager: RuntimeManager) -> Result<(), RuntimeManager> {
    GLOBAL_RUNTIME.set(manager)
}

/// The global manager, creating a wasmtime-backed one on first use.
///
/// # Errors
///
/// Returns [`RuntimeError::HostUnavailable`] if the engine cannot be created.
pub fn global_runtime() -> RuntimeResult<&'static RuntimeManager> {
    if let Some(manager) = GLOBAL_RUNTIME.get() {
        return Ok(manager);
    }
    let host = WasmtimeHost::new().map_err(|source| RuntimeError::HostUnavailable { source })?;
    debug!("Creating global runtime manager with wasmtime host");
    Ok(GLOBAL_RUNTIME.get_or_init(|| RuntimeManager::new(Arc::new(host))))
}

/// Initialize the global runtime. See [`RuntimeManager::initialize`].
///
/// # Errors
///
/// Every error of [`RuntimeManager::initialize`], plus
/// [`RuntimeError::HostUnavailable`].
pub async fn initialize_runtime(config: &InitConfig) -> RuntimeResult<LoadReport> {
    global_runtime()?.initialize(config).await
}

/// The Ready module handle of the global runtime.
///
/// # Errors
///
/// Returns [`RuntimeError::NotInitialized`] unless the runtime is Ready.
pub fn get_instance() -> RuntimeResult<Arc<ModuleHandle>> {
    GLOBAL_RUNTIME
        .get()
        .ok_or(RuntimeError::NotInitialized)?
        .get_instance()
}

/// Dispose the global runtime. No-op unless Ready.
pub fn dispose() -> bool {
    GLOBAL_RUNTIME.get().is_some_and(RuntimeManager::dispose)
}

/// Lifecycle state of the global runtime (`Uninitialized` if none exists).
pub fn runtime_state() -> LifecycleState {
    GLOBAL_RUNTIME
        .get()
        .map_or(LifecycleState::Uninitialized, RuntimeManager::state)
}

/// `true` only when the global runtime is Ready.
pub fn is_runtime_initialized() -> bool {
    runtime_state().is_ready()
}

/// Status of the global runtime for diagnostics.
pub fn runtime_status_message() -> String {
    GLOBAL_RUNTIME
        .get()
        .map_or_else(|| "Not initialized".to_string(), RuntimeManager::status_message)
}
