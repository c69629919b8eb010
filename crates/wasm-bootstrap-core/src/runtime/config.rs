//! Configuration for runtime initialization.
//!
//! # Overview
//!
//! [`InitConfig`] is the caller-supplied configuration read once at the start
//! of initialization. [`BuildFlags`] is the build-time configuration that can
//! disable whole variant families (threads, JSEP, training).
//!
//! # Environment Variable Overrides
//!
//! [`InitConfig::from_env()`] reads:
//!
//! | Field | Environment Variable | Default |
//! |-------|---------------------|---------|
//! | `num_threads` | `WASM_BOOTSTRAP_NUM_THREADS` | 0 (auto) |
//! | `simd` | `WASM_BOOTSTRAP_SIMD` | true |
//! | `init_timeout_ms` | `WASM_BOOTSTRAP_INIT_TIMEOUT_MS` | 0 (no timeout) |
//! | `wasm_paths` | `WASM_BOOTSTRAP_PATHS` | unset |
//!
//! `WASM_BOOTSTRAP_PATHS` is either a path prefix or a JSON object mapping
//! literal asset file names to locations.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{RuntimeError, RuntimeResult};

/// Upper bound for the automatically chosen thread count.
const MAX_AUTO_THREADS: usize = 4;

/// Asset location overrides.
///
/// Deserializes from either a JSON string (path prefix) or a JSON object
/// (per-file mapping), matching the two shapes accepted by
/// `initialize_runtime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WasmPaths {
    /// Prefix prepended verbatim to every asset file name.
    Prefix(String),
    /// Literal asset file name (e.g. `ort-wasm-simd.wasm`) to location.
    Files(HashMap<String, String>),
}

impl WasmPaths {
    /// Parse a raw override: a JSON object becomes [`WasmPaths::Files`],
    /// anything else is taken as a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] if `raw` starts like a JSON
    /// object but is not a map of strings.
    pub fn parse(raw: &str) -> RuntimeResult<Self> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('{') {
            return Ok(Self::Prefix(raw.to_string()));
        }
        serde_json::from_str::<HashMap<String, String>>(trimmed)
            .map(Self::Files)
            .map_err(|e| RuntimeError::InvalidConfig {
                field: "wasm_paths".to_string(),
                reason: format!("expected a JSON object of file names to locations: {e}"),
            })
    }

    /// The prefix override, if this is a prefix.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Prefix(prefix) => Some(prefix),
            Self::Files(_) => None,
        }
    }

    /// The per-file override for `file_name`, if this is a mapping.
    #[must_use]
    pub fn file_override(&self, file_name: &str) -> Option<&str> {
        match self {
            Self::Prefix(_) => None,
            Self::Files(files) => files.get(file_name).map(String::as_str),
        }
    }
}

/// Boolean environment value; `None` when unrecognised.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Caller-supplied initialization configuration.
///
/// Never mutated after initialization begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Requested worker thread count. `0` picks `min(4, ceil(cpus / 2))`,
    /// `1` explicitly requests single-threaded execution.
    pub num_threads: usize,

    /// Whether SIMD variants may be selected.
    pub simd: bool,

    /// Instantiation budget in milliseconds. `0` disables the timeout.
    pub init_timeout_ms: u64,

    /// Optional asset location overrides.
    pub wasm_paths: Option<WasmPaths>,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            simd: true,
            init_timeout_ms: 0,
            wasm_paths: None,
        }
    }
}

impl InitConfig {
    /// Load configuration from environment variables.
    ///
    /// Falls back to default values for any unset or unparsable variable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WASM_BOOTSTRAP_NUM_THREADS") {
            if let Ok(threads) = val.trim().parse::<usize>() {
                config.num_threads = threads;
            }
        }

        if let Ok(val) = std::env::var("WASM_BOOTSTRAP_SIMD") {
            match parse_flag(&val) {
                Some(simd) => config.simd = simd,
                None => warn!(value = %val, "Ignoring unrecognised WASM_BOOTSTRAP_SIMD"),
            }
        }

        if let Ok(val) = std::env::var("WASM_BOOTSTRAP_INIT_TIMEOUT_MS") {
            // Negative values mean "no timeout", same as zero.
            if let Ok(ms) = val.trim().parse::<i64>() {
                config.init_timeout_ms = u64::try_from(ms).unwrap_or(0);
            }
        }

        if let Ok(val) = std::env::var("WASM_BOOTSTRAP_PATHS") {
            if !val.trim().is_empty() {
                match WasmPaths::parse(&val) {
                    Ok(paths) => config.wasm_paths = Some(paths),
                    Err(e) => warn!(error = %e, "Ignoring WASM_BOOTSTRAP_PATHS"),
                }
            }
        }

        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] for an empty prefix, an empty
    /// mapping key, or an empty mapped location.
    pub fn validate(&self) -> RuntimeResult<()> {
        match &self.wasm_paths {
            Some(WasmPaths::Prefix(prefix)) if prefix.trim().is_empty() => {
                Err(RuntimeError::InvalidConfig {
                    field: "wasm_paths".to_string(),
                    reason: "path prefix must not be empty".to_string(),
                })
            }
            Some(WasmPaths::Files(files)) => {
                for (file_name, location) in files {
                    if file_name.trim().is_empty() {
                        return Err(RuntimeError::InvalidConfig {
                            field: "wasm_paths".to_string(),
                            reason: "asset file name must not be empty".to_string(),
                        });
                    }
                    if location.trim().is_empty() {
                        return Err(RuntimeError::InvalidConfig {
                            field: format!("wasm_paths[{file_name}]"),
                            reason: "asset location must not be empty".to_string(),
                        });
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Thread count after resolving `0` to the automatic default.
    #[must_use]
    pub fn resolved_num_threads(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.div_ceil(2).clamp(1, MAX_AUTO_THREADS)
    }

    /// The instantiation budget, or `None` when the timeout is disabled.
    #[must_use]
    pub fn init_timeout(&self) -> Option<Duration> {
        (self.init_timeout_ms > 0).then(|| Duration::from_millis(self.init_timeout_ms))
    }
}

/// Build-time switches that remove whole variant families.
///
/// Derived from cargo features by default; constructible directly so that
/// every combination can be exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BuildFlags {
    /// Training support is not built; when `false` the training variant wins
    /// over every other axis.
    pub disable_training: bool,
    /// The JSEP (JavaScript execution provider) sub-variants are not built.
    pub disable_jsep: bool,
    /// Threaded variants are not built.
    pub disable_wasm_thread: bool,
}

impl BuildFlags {
    /// Flags derived from the `training`, `jsep` and `threads` features.
    #[must_use]
    pub const fn from_features() -> Self {
        Self {
            disable_training: !cfg!(feature = "training"),
            disable_jsep: !cfg!(feature = "jsep"),
            disable_wasm_thread: !cfg!(feature = "threads"),
        }
    }
}

impl Default for BuildFlags {
    fn default() -> Self {
        Self::from_features()
    }
}
