//! Binary-execution host abstraction.
//!
//! The bootstrap never talks to an engine directly. It consumes three host
//! primitives (validate a candidate binary, create a shared memory buffer,
//! instantiate a module from a binary) plus the asset fetch used for
//! prefetching the worker bootstrap.
//!
//! [`WasmtimeHost`] is the production host. Tests drive the lifecycle with a
//! scripted host implementing the same trait.

mod wasmtime_host;

pub use wasmtime_host::{WasmtimeHost, WasmtimeModule};

use async_trait::async_trait;

use super::assets::{FileLocator, PrefetchedAsset};
use super::error::HostResult;
use super::handle::ComputeModule;
use super::variant::VariantName;
use super::worker_pool::WorkerPool;

/// Everything the host needs to instantiate one variant.
#[derive(Debug, Clone)]
pub struct InstantiateRequest {
    /// Variant to instantiate.
    pub variant: VariantName,
    /// File-locator callback for `.wasm` and worker bootstrap requests.
    pub locator: FileLocator,
    /// Worker thread count. Set only for threaded loads.
    pub num_threads: Option<usize>,
    /// Main-script URL override. Set only for threaded loads with a prefix.
    pub main_script_url: Option<String>,
    /// Worker bootstrap fetched ahead of time. Set only for threaded loads.
    pub worker_bootstrap: Option<PrefetchedAsset>,
}

impl InstantiateRequest {
    /// Location of the variant's `.wasm` binary, as the locator resolves it.
    #[must_use]
    pub fn wasm_location(&self) -> String {
        self.locator.locate(&self.variant.wasm_file_name())
    }

    #[must_use]
    pub fn is_threaded(&self) -> bool {
        self.num_threads.is_some()
    }
}

/// Result of a successful instantiation.
#[derive(Debug)]
pub struct Instantiated {
    pub module: Box<dyn ComputeModule>,
    /// Present only for threaded loads.
    pub worker_pool: Option<WorkerPool>,
}

/// Host environment able to validate and instantiate WebAssembly binaries.
///
/// The probe primitives are synchronous; instantiation and asset fetching
/// may suspend.
#[async_trait]
pub trait WasmHost: Send + Sync {
    /// Short host name for logs.
    fn name(&self) -> &'static str;

    /// Whether the engine accepts `bytes` as a valid module.
    ///
    /// `Ok(false)` means "invalid program"; `Err` means the primitive itself
    /// failed.
    fn validate(&self, bytes: &[u8]) -> HostResult<bool>;

    /// Whether shared memory buffers can be created at all.
    fn shared_memory_available(&self) -> bool;

    /// Whether the host runs in an isolation mode that permits shared
    /// memory. `None` when the concept does not apply.
    fn cross_origin_isolated(&self) -> Option<bool> {
        None
    }

    /// Move a one-page shared buffer across an execution-context boundary
    /// and back.
    fn probe_shared_memory_transfer(&self) -> HostResult<()>;

    /// Read the asset at `location` without executing it.
    async fn fetch_asset(&self, location: &str) -> HostResult<Vec<u8>>;

    /// Load and instantiate the variant described by `request`.
    async fn instantiate(&self, request: InstantiateRequest) -> HostResult<Instantiated>;
}
