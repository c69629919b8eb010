//! Report describing a completed load.

use std::time::Duration;

use serde::Serialize;

use crate::runtime::probe::CapabilityFlags;
use crate::runtime::variant::VariantName;

/// What was loaded, from where, and how long it took.
///
/// Returned by a successful initialization and again, unchanged, by every
/// later initialization of the same Ready runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Variant that was instantiated.
    pub variant: VariantName,
    /// Capabilities detected before selection. SIMD is only probed when
    /// preferred and threads only when built; an unprobed flag is `false`.
    pub capabilities: CapabilityFlags,
    /// Whether the threaded code path was taken.
    pub threaded: bool,
    /// Thread count handed to the host (threaded loads only).
    pub num_threads: Option<usize>,
    /// Resolved location of the `.wasm` binary.
    pub wasm_location: String,
    /// Resolved location of the worker bootstrap (threaded loads only).
    pub worker_location: Option<String>,
    /// Main-script URL override (threaded loads with a prefix only).
    pub main_script_url: Option<String>,
    /// Wall-clock time from the start of the load to Ready.
    pub elapsed_ms: u64,
}

impl LoadReport {
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// One-line human readable summary.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let threads = self
            .num_threads
            .map_or_else(|| "single-threaded".to_string(), |n| format!("{n} threads"));
        format!(
            "{} ({}, simd={}) from {} in {}ms",
            self.variant, threads, self.capabilities.simd_supported, self.wasm_location, self.elapsed_ms
        )
    }
}
