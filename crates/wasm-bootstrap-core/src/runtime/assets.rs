//! Asset location resolution.
//!
//! Precedence for every asset: a path prefix override is applied uniformly,
//! a per-file mapping is looked up by literal file name, and everything else
//! falls back to the co-located script directory.

use std::path::{Path, MAIN_SEPARATOR};
use std::sync::Arc;

use super::config::WasmPaths;
use super::error::{RuntimeError, RuntimeResult};
use super::variant::VariantName;

/// Environment variable overriding the co-located asset directory.
pub const ASSET_DIR_ENV: &str = "WASM_BOOTSTRAP_ASSET_DIR";

/// An asset fetched ahead of instantiation but never executed.
#[derive(Debug, Clone)]
pub struct PrefetchedAsset {
    pub file_name: String,
    pub location: String,
    pub bytes: Arc<[u8]>,
}

/// File-locator callback handed to the host at instantiation time.
///
/// Redirects `.wasm` and worker-bootstrap requests to their resolved
/// overrides; every other file goes to `(prefix or directory) + file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocator {
    prefix: Option<String>,
    wasm_override: Option<String>,
    worker: Option<(String, String)>,
    script_directory: String,
}

impl FileLocator {
    /// Locate `file_name` relative to the default script directory.
    #[must_use]
    pub fn locate(&self, file_name: &str) -> String {
        self.locate_in(file_name, &self.script_directory)
    }

    /// Locate `file_name`, using `script_directory` when no prefix applies.
    #[must_use]
    pub fn locate_in(&self, file_name: &str, script_directory: &str) -> String {
        if file_name.ends_with(".wasm") {
            if let Some(location) = &self.wasm_override {
                return location.clone();
            }
        }

        if let Some((worker_name, worker_location)) = &self.worker {
            if file_name == worker_name && worker_location != worker_name {
                return worker_location.clone();
            }
        }

        let base = self.prefix.as_deref().unwrap_or(script_directory);
        format!("{base}{file_name}")
    }

    #[must_use]
    pub fn script_directory(&self) -> &str {
        &self.script_directory
    }
}

/// Resolves variant asset locations from the caller's overrides.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    paths: Option<WasmPaths>,
    script_directory: String,
}

impl AssetResolver {
    /// Create a resolver. `script_directory` gets a trailing separator if it
    /// lacks one.
    #[must_use]
    pub fn new(paths: Option<WasmPaths>, script_directory: impl Into<String>) -> Self {
        Self {
            paths,
            script_directory: with_trailing_separator(script_directory.into()),
        }
    }

    /// Prefix override, if the caller supplied one.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.paths.as_ref().and_then(WasmPaths::prefix)
    }

    fn resolve(&self, file_name: &str) -> String {
        if let Some(prefix) = self.prefix() {
            return format!("{prefix}{file_name}");
        }
        if let Some(location) = self
            .paths
            .as_ref()
            .and_then(|paths| paths.file_override(file_name))
        {
            return location.to_string();
        }
        format!("{}{}", self.script_directory, file_name)
    }

    /// Location of `<variant>.wasm`.
    #[must_use]
    pub fn wasm_location(&self, variant: VariantName) -> String {
        self.resolve(&variant.wasm_file_name())
    }

    /// Location of `<variant>.worker.js`.
    #[must_use]
    pub fn worker_location(&self, variant: VariantName) -> String {
        self.resolve(&variant.worker_file_name())
    }

    /// Main-script URL override: only set when a prefix override exists.
    #[must_use]
    pub fn main_script_url(&self, variant: VariantName) -> Option<String> {
        self.prefix()
            .map(|prefix| format!("{prefix}{}", variant.factory_file_name()))
    }

    /// Build the locator callback for an instantiation of `variant`.
    #[must_use]
    pub fn locator(&self, variant: VariantName, threaded: bool) -> FileLocator {
        let wasm_override = self
            .paths
            .as_ref()
            .and_then(|paths| paths.file_override(&variant.wasm_file_name()))
            .map(str::to_string);
        let worker = threaded.then(|| (variant.worker_file_name(), self.worker_location(variant)));

        FileLocator {
            prefix: self.prefix().map(str::to_string),
            wasm_override,
            worker,
            script_directory: self.script_directory.clone(),
        }
    }
}

/// Default co-located asset directory, with a trailing separator.
///
/// Uses [`ASSET_DIR_ENV`] when set, else the directory of the running
/// executable.
///
/// # Errors
///
/// Returns [`RuntimeError::AssetResolution`] when the executable path cannot
/// be determined.
pub fn default_script_directory() -> RuntimeResult<String> {
    if let Ok(dir) = std::env::var(ASSET_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(with_trailing_separator(dir));
        }
    }

    let exe = std::env::current_exe().map_err(|e| RuntimeError::AssetResolution {
        file_name: "<script directory>".to_string(),
        reason: format!("cannot determine executable path: {e}"),
    })?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(with_trailing_separator(dir.display().to_string()))
}

fn with_trailing_separator(mut dir: String) -> String {
    if !dir.is_empty() && !dir.ends_with('/') && !dir.ends_with(MAIN_SEPARATOR) {
        dir.push(MAIN_SEPARATOR);
    }
    dir
}
