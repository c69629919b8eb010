//! Load planning: capability probing, variant selection, asset resolution.

use std::time::Duration;

use tracing::info;

use crate::runtime::assets::{AssetResolver, FileLocator, PrefetchedAsset};
use crate::runtime::config::{BuildFlags, InitConfig};
use crate::runtime::host::{InstantiateRequest, WasmHost};
use crate::runtime::probe::{simd_supported, threads_supported, CapabilityFlags};
use crate::runtime::variant::{select_variant, VariantName};

use super::report::LoadReport;

/// Everything decided before the instantiation task starts.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub capabilities: CapabilityFlags,
    /// Threads were both built and supported.
    pub use_threads: bool,
    /// SIMD was both requested and supported.
    pub use_simd: bool,
    pub variant: VariantName,
    pub num_threads: Option<usize>,
    pub wasm_location: String,
    pub worker_location: Option<String>,
    pub main_script_url: Option<String>,
    pub locator: FileLocator,
    pub timeout_ms: u64,
}

impl LoadPlan {
    /// Probe the capabilities a load of `config` can use.
    ///
    /// Threads are not probed when the threaded build is disabled, SIMD is
    /// not probed when it is not preferred; an unprobed capability reads as
    /// unsupported. Blocks while the host probes.
    #[must_use]
    pub fn probe(host: &dyn WasmHost, config: &InitConfig, build_flags: BuildFlags) -> CapabilityFlags {
        let requested_threads = config.resolved_num_threads();
        CapabilityFlags {
            threads_supported: !build_flags.disable_wasm_thread
                && threads_supported(host, requested_threads),
            simd_supported: config.simd && simd_supported(host),
        }
    }

    /// Select the variant for `capabilities` and resolve its assets.
    #[must_use]
    pub fn resolve(
        host_name: &str,
        capabilities: CapabilityFlags,
        config: &InitConfig,
        build_flags: BuildFlags,
        script_directory: String,
    ) -> Self {
        let requested_threads = config.resolved_num_threads();
        let use_threads = capabilities.threads_supported;
        let use_simd = config.simd && capabilities.simd_supported;
        let variant = select_variant(use_simd, use_threads, build_flags);

        let resolver = AssetResolver::new(config.wasm_paths.clone(), script_directory);
        let wasm_location = resolver.wasm_location(variant);
        let worker_location = use_threads.then(|| resolver.worker_location(variant));
        let main_script_url = if use_threads {
            resolver.main_script_url(variant)
        } else {
            None
        };

        info!(
            host = host_name,
            variant = %variant,
            threads = use_threads,
            simd = use_simd,
            requested_threads,
            wasm = %wasm_location,
            "Selected WebAssembly variant"
        );

        Self {
            capabilities,
            use_threads,
            use_simd,
            variant,
            num_threads: use_threads.then_some(requested_threads),
            wasm_location,
            worker_location,
            main_script_url,
            locator: resolver.locator(variant, use_threads),
            timeout_ms: config.init_timeout_ms,
        }
    }

    /// Instantiation budget, `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Host request for this plan.
    #[must_use]
    pub fn request(&self, worker_bootstrap: Option<PrefetchedAsset>) -> InstantiateRequest {
        InstantiateRequest {
            variant: self.variant,
            locator: self.locator.clone(),
            num_threads: self.num_threads,
            main_script_url: self.main_script_url.clone(),
            worker_bootstrap,
        }
    }

    /// Report for a load of this plan that took `elapsed`.
    #[must_use]
    pub fn report(&self, elapsed: Duration) -> LoadReport {
        LoadReport {
            variant: self.variant,
            capabilities: self.capabilities,
            threaded: self.use_threads,
            num_threads: self.num_threads,
            wasm_location: self.wasm_location.clone(),
            worker_location: self.worker_location.clone(),
            main_script_url: self.main_script_url.clone(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
