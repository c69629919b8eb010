//! Runtime manager: the injectable owner of one lifecycle.
//!
//! Control flow of [`RuntimeManager::initialize`]:
//! prober -> selector -> loader (lifecycle checked before and after) ->
//! handle registry.

use std::sync::Arc;

use tracing::{debug, info};

use super::config::{BuildFlags, InitConfig};
use super::error::RuntimeResult;
use super::handle::ModuleHandle;
use super::host::WasmHost;
use super::lifecycle::{InitStart, LifecycleMachine};
use super::loader::{LoadReport, Loader};
use super::probe::CapabilityFlags;
use super::state::{AbortCause, LifecycleState};

/// Owns the host and the single module lifecycle.
///
/// Construct one per process for production (see `global_runtime`) or one
/// per test for isolation.
pub struct RuntimeManager {
    host: Arc<dyn WasmHost>,
    lifecycle: Arc<LifecycleMachine>,
    build_flags: BuildFlags,
    script_directory: Option<String>,
}

impl RuntimeManager {
    /// Create a manager with build flags derived from cargo features.
    #[must_use]
    pub fn new(host: Arc<dyn WasmHost>) -> Self {
        Self {
            host,
            lifecycle: Arc::new(LifecycleMachine::new()),
            build_flags: BuildFlags::from_features(),
            script_directory: None,
        }
    }

    /// Override the build-time variant switches.
    #[must_use]
    pub fn with_build_flags(mut self, build_flags: BuildFlags) -> Self {
        self.build_flags = build_flags;
        self
    }

    /// Override the co-located asset directory.
    #[must_use]
    pub fn with_script_directory(mut self, dir: impl Into<String>) -> Self {
        self.script_directory = Some(dir.into());
        self
    }

    /// Initialize the runtime.
    ///
    /// A Ready runtime returns its stored report without loading again.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::InvalidConfig`](super::error::RuntimeError::InvalidConfig)
    ///   before any state change
    /// - [`RuntimeError::AlreadyInitializing`](super::error::RuntimeError::AlreadyInitializing)
    ///   while another call is loading
    /// - [`RuntimeError::PreviouslyAborted`](super::error::RuntimeError::PreviouslyAborted)
    ///   after a failure, timeout, or dispose
    /// - [`RuntimeError::InitTimeout`](super::error::RuntimeError::InitTimeout) and
    ///   [`RuntimeError::InitFailed`](super::error::RuntimeError::InitFailed) from the load
    pub async fn initialize(&self, config: &InitConfig) -> RuntimeResult<LoadReport> {
        config.validate()?;

        match self.lifecycle.begin_initialize()? {
            InitStart::AlreadyReady(handle) => {
                debug!(instance_id = %handle.instance_id(), "Runtime already initialized, skipping");
                Ok(handle.report().clone())
            }
            InitStart::Started => {
                info!(
                    num_threads = config.num_threads,
                    simd = config.simd,
                    init_timeout_ms = config.init_timeout_ms,
                    "Initializing WebAssembly runtime"
                );
                Loader::new(
                    Arc::clone(&self.host),
                    Arc::clone(&self.lifecycle),
                    self.build_flags,
                    self.script_directory.clone(),
                )
                .load(config)
                .await
            }
        }
    }

    /// The Ready module handle.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotInitialized`](super::error::RuntimeError::NotInitialized)
    /// unless the runtime is Ready.
    pub fn get_instance(&self) -> RuntimeResult<Arc<ModuleHandle>> {
        self.lifecycle.handle()
    }

    /// Tear down the Ready instance. No-op in any other state.
    ///
    /// Worker termination is requested synchronously; the threads finish
    /// their current job and exit on their own. Returns `true` if an instance
    /// was disposed.
    pub fn dispose(&self) -> bool {
        match self.lifecycle.dispose() {
            Some(terminated_workers) => {
                info!(terminated_workers, "WebAssembly runtime disposed");
                true
            }
            None => {
                debug!(state = %self.state(), "Dispose ignored: runtime not ready");
                false
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Why the runtime aborted, if it did.
    #[must_use]
    pub fn abort_cause(&self) -> Option<AbortCause> {
        self.lifecycle.abort_cause()
    }

    /// Human-readable status for diagnostics.
    #[must_use]
    pub fn status_message(&self) -> String {
        match self.state() {
            LifecycleState::Uninitialized => "Not initialized".to_string(),
            LifecycleState::Initializing => "Initialization in progress".to_string(),
            LifecycleState::Ready => match self.lifecycle.handle() {
                Ok(handle) => format!("Ready ({}, instance {})", handle.variant(), handle.instance_id()),
                Err(_) => "Not initialized".to_string(),
            },
            LifecycleState::Aborted => match self.abort_cause() {
                Some(cause) => format!("Aborted: {cause}"),
                None => "Aborted".to_string(),
            },
        }
    }

    /// Probe the host without touching the lifecycle.
    #[must_use]
    pub fn probe_capabilities(&self, requested_threads: usize) -> CapabilityFlags {
        CapabilityFlags::detect(self.host.as_ref(), requested_threads)
    }

    #[must_use]
    pub fn build_flags(&self) -> BuildFlags {
        self.build_flags
    }

    #[must_use]
    pub fn host(&self) -> &Arc<dyn WasmHost> {
        &self.host
    }
}

impl std::fmt::Debug for RuntimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeManager")
            .field("host", &self.host.name())
            .field("state", &self.state())
            .field("build_flags", &self.build_flags)
            .field("script_directory", &self.script_directory)
            .finish()
    }
}
