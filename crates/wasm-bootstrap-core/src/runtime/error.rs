//! Error types and exit codes for the runtime bootstrap.
//!
//! # Exit Code Mapping
//!
//! | Exit Code | Error Variant | Description |
//! |-----------|---------------|-------------|
//! | 101 | `InitFailed` | The engine rejected the selected binary variant |
//! | 102 | `InitTimeout` | Instantiation exceeded the configured budget |
//! | 103 | `AlreadyInitializing` | Re-entrant call while a load is in flight |
//! | 104 | `PreviouslyAborted` | Reuse after a failed load or after dispose |
//! | 105 | `NotInitialized` | Instance requested before the runtime is ready |
//! | 106 | `InvalidConfig` | Caller-supplied configuration rejected |
//! | 107 | `AssetResolution` | Asset location could not be computed |
//! | 108 | `HostUnavailable` | The binary-execution host could not be created |
//!
//! Capability probe failures never surface here: the prober downgrades them
//! to "feature unsupported".

use thiserror::Error;

/// Failure reported by the binary-execution host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The validation primitive itself failed (not "the program is invalid").
    #[error("Binary validation failed: {reason}")]
    Validation { reason: String },

    /// A capability probe step failed.
    #[error("Capability probe '{probe}' failed: {reason}")]
    ProbeFailed { probe: &'static str, reason: String },

    /// Asset could not be read from its resolved location.
    #[error("Asset unavailable at {location}: {source}")]
    AssetUnavailable {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolved location uses a scheme the host cannot fetch.
    #[error("Unsupported asset location: {location}")]
    UnsupportedLocation { location: String },

    /// The engine rejected the binary during compilation.
    #[error("Compilation of {location} failed: {reason}")]
    Compile { location: String, reason: String },

    /// The engine failed to instantiate a compiled module.
    #[error("Instantiation failed: {reason}")]
    Instantiate { reason: String },

    /// A worker thread could not be started.
    #[error("Failed to spawn worker thread {index}: {source}")]
    WorkerSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    /// Work was submitted to a pool that has already been terminated.
    #[error("Worker pool has been terminated")]
    PoolTerminated,

    /// The instantiation task panicked or was cancelled by the executor.
    #[error("Instantiation task aborted: {reason}")]
    TaskAborted { reason: String },
}

/// Result type alias for host primitives.
pub type HostResult<T> = Result<T, HostError>;

/// Error type for runtime bootstrap operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `initialize` was called while another initialization is in flight.
    #[error("multiple calls to initialize_runtime() detected: initialization already in progress")]
    AlreadyInitializing,

    /// A previous initialization failed, timed out, or the runtime was disposed.
    #[error("previous call to initialize_runtime() failed or the runtime was disposed")]
    PreviouslyAborted,

    /// The module instance was requested before the runtime became ready.
    #[error("WebAssembly runtime is not initialized yet")]
    NotInitialized,

    /// Instantiation did not finish within the configured budget.
    #[error("WebAssembly backend initializing failed due to timeout: {timeout_ms}ms")]
    InitTimeout { timeout_ms: u64 },

    /// The engine rejected the selected variant.
    #[error("WebAssembly backend failed to initialize variant {variant}: {source}")]
    InitFailed {
        variant: String,
        #[source]
        source: HostError,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Asset location could not be computed.
    #[error("Cannot resolve asset {file_name}: {reason}")]
    AssetResolution { file_name: String, reason: String },

    /// The binary-execution host could not be constructed.
    #[error("WebAssembly host unavailable: {source}")]
    HostUnavailable {
        #[source]
        source: HostError,
    },
}

impl RuntimeError {
    /// Get the process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InitFailed { .. } => 101,
            Self::InitTimeout { .. } => 102,
            Self::AlreadyInitializing => 103,
            Self::PreviouslyAborted => 104,
            Self::NotInitialized => 105,
            Self::InvalidConfig { .. } => 106,
            Self::AssetResolution { .. } => 107,
            Self::HostUnavailable { .. } => 108,
        }
    }

    /// Whether a host application may retry with a different capability
    /// configuration (for example without threads) in a fresh manager.
    #[must_use]
    pub fn is_retryable_with_fallback(&self) -> bool {
        matches!(self, Self::InitTimeout { .. } | Self::InitFailed { .. })
    }

    /// Get the error category name for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::AlreadyInitializing | Self::PreviouslyAborted | Self::NotInitialized => {
                "LIFECYCLE"
            }
            Self::InitTimeout { .. } => "TIMEOUT",
            Self::InitFailed { .. } => "INSTANTIATE",
            Self::InvalidConfig { .. } => "CONFIG",
            Self::AssetResolution { .. } => "ASSET",
            Self::HostUnavailable { .. } => "HOST",
        }
    }

    /// Get the structured error code for logging (e.g., "ERR-WASM-INIT-TIMEOUT").
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyInitializing => "ERR-WASM-ALREADY-INITIALIZING",
            Self::PreviouslyAborted => "ERR-WASM-PREVIOUSLY-ABORTED",
            Self::NotInitialized => "ERR-WASM-NOT-INITIALIZED",
            Self::InitTimeout { .. } => "ERR-WASM-INIT-TIMEOUT",
            Self::InitFailed { .. } => "ERR-WASM-INIT-FAILED",
            Self::InvalidConfig { .. } => "ERR-WASM-CONFIG-INVALID",
            Self::AssetResolution { .. } => "ERR-WASM-ASSET-RESOLUTION",
            Self::HostUnavailable { .. } => "ERR-WASM-HOST-UNAVAILABLE",
        }
    }
}

/// Result type alias for runtime bootstrap operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
