//! Loader engine: prefetch, spawn, and the timeout race.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::{self, JoinError, JoinHandle};
use tracing::{debug, error};

use crate::runtime::assets::{default_script_directory, PrefetchedAsset};
use crate::runtime::config::{BuildFlags, InitConfig};
use crate::runtime::error::{HostError, RuntimeError, RuntimeResult};
use crate::runtime::host::WasmHost;
use crate::runtime::lifecycle::LifecycleMachine;
use crate::runtime::probe::CapabilityFlags;
use crate::runtime::state::AbortCause;
use crate::runtime::variant::VariantName;

use super::completion::instantiate_and_settle;
use super::plan::LoadPlan;
use super::report::LoadReport;

/// Drives one load while the lifecycle is `Initializing`.
pub struct Loader {
    host: Arc<dyn WasmHost>,
    lifecycle: Arc<LifecycleMachine>,
    build_flags: BuildFlags,
    script_directory: Option<String>,
}

impl Loader {
    #[must_use]
    pub fn new(
        host: Arc<dyn WasmHost>,
        lifecycle: Arc<LifecycleMachine>,
        build_flags: BuildFlags,
        script_directory: Option<String>,
    ) -> Self {
        Self {
            host,
            lifecycle,
            build_flags,
            script_directory,
        }
    }

    /// Load the variant for `config`.
    ///
    /// Must be called right after the lifecycle entered `Initializing`.
    /// Every exit path leaves the lifecycle in a terminal state, or hands
    /// that duty to the still-running instantiation task.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::InitTimeout`] if the timer won the race
    /// - [`RuntimeError::InitFailed`] if the host rejected the variant
    /// - [`RuntimeError::AssetResolution`] if no asset directory is available
    pub async fn load(&self, config: &InitConfig) -> RuntimeResult<LoadReport> {
        let result = self.run(config).await;
        if let Err(e) = &result {
            error!(
                error_code = e.error_code(),
                category = e.category(),
                error = %e,
                "WebAssembly runtime initialization failed"
            );
        }
        result
    }

    async fn run(&self, config: &InitConfig) -> RuntimeResult<LoadReport> {
        let started = Instant::now();
        let mut pending = PendingGuard::new(&self.lifecycle);

        let script_directory = match &self.script_directory {
            Some(dir) => dir.clone(),
            None => match default_script_directory() {
                Ok(dir) => dir,
                Err(e) => {
                    self.lifecycle.mark_aborted(AbortCause::Failed(e.to_string()));
                    return Err(e);
                }
            },
        };

        let capabilities = self.probe(config).await;
        let plan = LoadPlan::resolve(
            self.host.name(),
            capabilities,
            config,
            self.build_flags,
            script_directory,
        );

        let worker_bootstrap = match &plan.worker_location {
            Some(location) => Some(self.prefetch_worker(plan.variant, location).await?),
            None => None,
        };

        let request = plan.request(worker_bootstrap);
        let variant = plan.variant;
        let timeout = plan.timeout();
        let mut instantiation = task::spawn(instantiate_and_settle(
            Arc::clone(&self.host),
            Arc::clone(&self.lifecycle),
            plan,
            request,
            started,
        ));
        pending.disarm();

        let Some(limit) = timeout else {
            return self.settle(variant, instantiation.await);
        };

        tokio::select! {
            biased;
            joined = &mut instantiation => self.settle(variant, joined),
            () = tokio::time::sleep(limit) => {
                self.expire(variant, instantiation, config.init_timeout_ms).await
            }
        }
    }

    /// Probe on a blocking task; host probes may block for seconds.
    async fn probe(&self, config: &InitConfig) -> CapabilityFlags {
        let host = Arc::clone(&self.host);
        let config = config.clone();
        let build_flags = self.build_flags;
        match task::spawn_blocking(move || LoadPlan::probe(host.as_ref(), &config, build_flags)).await {
            Ok(capabilities) => capabilities,
            Err(join_error) => {
                debug!(error = %join_error, "Capability probing task failed, treating as unsupported");
                CapabilityFlags::default()
            }
        }
    }

    /// The timer won the race.
    ///
    /// The instantiation task is detached, not cancelled. If it settled the
    /// lifecycle between the timer firing and this call, its outcome is
    /// reported instead of the timeout.
    async fn expire(
        &self,
        variant: VariantName,
        instantiation: JoinHandle<RuntimeResult<LoadReport>>,
        timeout_ms: u64,
    ) -> RuntimeResult<LoadReport> {
        if self.lifecycle.mark_aborted(AbortCause::TimedOut(timeout_ms)) {
            debug!(timeout_ms, "Instantiation still running after timeout");
            Err(RuntimeError::InitTimeout { timeout_ms })
        } else {
            self.settle(variant, instantiation.await)
        }
    }

    /// Fetch the worker bootstrap without executing it.
    async fn prefetch_worker(
        &self,
        variant: VariantName,
        location: &str,
    ) -> RuntimeResult<PrefetchedAsset> {
        match self.host.fetch_asset(location).await {
            Ok(bytes) => {
                debug!(location, bytes = bytes.len(), "Worker bootstrap prefetched");
                Ok(PrefetchedAsset {
                    file_name: variant.worker_file_name(),
                    location: location.to_string(),
                    bytes: bytes.into(),
                })
            }
            Err(source) => {
                self.lifecycle.mark_aborted(AbortCause::Failed(source.to_string()));
                Err(RuntimeError::InitFailed {
                    variant: variant.to_string(),
                    source,
                })
            }
        }
    }

    fn settle(
        &self,
        variant: VariantName,
        joined: Result<RuntimeResult<LoadReport>, JoinError>,
    ) -> RuntimeResult<LoadReport> {
        joined.unwrap_or_else(|join_error| {
            let reason = join_error.to_string();
            self.lifecycle.mark_aborted(AbortCause::Failed(reason.clone()));
            Err(RuntimeError::InitFailed {
                variant: variant.to_string(),
                source: HostError::TaskAborted { reason },
            })
        })
    }
}

/// Aborts the lifecycle if the load future is dropped before the
/// instantiation task takes over.
struct PendingGuard<'a> {
    lifecycle: &'a LifecycleMachine,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(lifecycle: &'a LifecycleMachine) -> Self {
        Self {
            lifecycle,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.lifecycle
                .mark_aborted(AbortCause::Failed("load abandoned before instantiation".to_string()));
        }
    }
}
