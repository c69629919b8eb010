//! WebAssembly Runtime Bootstrap
//!
//! Detects which binary variant the host can run, loads exactly that variant
//! exactly once, enforces a load timeout, and owns the resulting handle.
//!
//! Modules:
//! - `error`: RuntimeError / HostError types and exit codes
//! - `config`: InitConfig, WasmPaths and BuildFlags
//! - `state`: LifecycleState and AbortCause
//! - `probe`: capability probes (threads, SIMD)
//! - `variant`: variant selection and asset file names
//! - `assets`: asset location resolution and the file locator
//! - `host`: WasmHost trait and the wasmtime host
//! - `worker_pool`: worker threads owned by threaded handles
//! - `handle`: ModuleHandle and the ComputeModule trait
//! - `lifecycle`: LifecycleMachine with guarded transitions
//! - `loader`: load planning and the timeout race
//! - `manager`: RuntimeManager tying it all together

pub mod assets;
pub mod config;
pub mod error;
pub mod handle;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod manager;
pub mod probe;
pub mod state;
pub mod variant;
pub mod worker_pool;

#[cfg(test)]
pub(crate) mod tests;

pub use config::{BuildFlags, InitConfig, WasmPaths};
pub use error::{HostError, HostResult, RuntimeError, RuntimeResult};
pub use handle::{ComputeModule, ModuleHandle};
pub use host::{InstantiateRequest, Instantiated, WasmHost, WasmtimeHost, WasmtimeModule};
pub use loader::LoadReport;
pub use manager::RuntimeManager;
pub use probe::CapabilityFlags;
pub use state::{AbortCause, LifecycleState};
pub use variant::{select_variant, VariantName};
