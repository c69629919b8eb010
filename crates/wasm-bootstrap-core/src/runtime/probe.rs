//! Capability probing through synthetic binary validation.
//!
//! Both probes ask the host to validate a tiny hand-encoded WebAssembly
//! program that only a capable engine accepts. Any failure while probing,
//! including a panic inside the host, is reported as "unsupported" and never
//! propagates to the caller.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::{debug, warn};

use super::error::HostResult;
use super::host::WasmHost;

/// Module with one shared memory and a function executing `i32.atomic.load`.
///
/// ```text
/// (module
///   (memory 1 1 shared)
///   (func (drop (i32.atomic.load (i32.const 0)))))
/// ```
pub const THREADS_PROBE_MODULE: [u8; 37] = [
    0, 97, 115, 109, 1, 0, 0, 0, 1, 4, 1, 96, 0, 0, 3, 2, 1, 0, 5, 4, 1, 3, 1, 1, 10, 11, 1, 9, 0,
    65, 0, 254, 16, 2, 0, 26, 11,
];

/// Module with a function executing `i32x4.dot_i16x8_s`.
///
/// ```text
/// (module
///   (func (drop (i32x4.dot_i16x8_s
///     (i8x16.splat (i32.const 0))
///     (v128.const i32x4 0 0 0 0)))))
/// ```
pub const SIMD_PROBE_MODULE: [u8; 50] = [
    0, 97, 115, 109, 1, 0, 0, 0, 1, 4, 1, 96, 0, 0, 3, 2, 1, 0, 10, 30, 1, 28, 0, 65, 0, 253, 15,
    253, 12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 253, 186, 1, 26, 11,
];

/// Capabilities detected for the current host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CapabilityFlags {
    /// Shared-memory threads are usable.
    pub threads_supported: bool,
    /// SIMD vector instructions are usable.
    pub simd_supported: bool,
}

impl CapabilityFlags {
    /// Run both probes against `host`.
    ///
    /// Blocks the calling thread while the host probes; async callers run
    /// this on a blocking task.
    #[must_use]
    pub fn detect(host: &dyn WasmHost, requested_threads: usize) -> Self {
        Self {
            threads_supported: threads_supported(host, requested_threads),
            simd_supported: simd_supported(host),
        }
    }
}

/// Whether multi-threaded execution is possible for `requested_threads`.
///
/// A request for exactly one thread short-circuits to `false` without
/// touching the host.
#[must_use]
pub fn threads_supported(host: &dyn WasmHost, requested_threads: usize) -> bool {
    if requested_threads == 1 {
        return false;
    }

    if !host.shared_memory_available() {
        if needs_isolation_guidance(host) {
            warn!(
                requested_threads,
                "Multi-threaded execution was requested, but shared memory is unavailable \
                 unless the host runs in an isolated (cross-origin isolated) mode"
            );
        }
        return false;
    }

    guarded("shared_memory_transfer", || {
        host.probe_shared_memory_transfer()?;
        host.validate(&THREADS_PROBE_MODULE)
    })
}

/// Shared memory is missing only because the host is not isolated.
#[must_use]
pub fn needs_isolation_guidance(host: &dyn WasmHost) -> bool {
    !host.shared_memory_available() && host.cross_origin_isolated() == Some(false)
}

/// Whether the host engine accepts SIMD instructions.
#[must_use]
pub fn simd_supported(host: &dyn WasmHost) -> bool {
    guarded("simd", || host.validate(&SIMD_PROBE_MODULE))
}

/// Run a probe step, folding errors and panics into `false`.
fn guarded<F>(probe: &'static str, step: F) -> bool
where
    F: FnOnce() -> HostResult<bool>,
{
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(supported)) => {
            debug!(probe, supported, "Capability probe finished");
            supported
        }
        Ok(Err(e)) => {
            debug!(probe, error = %e, "Capability probe failed, treating as unsupported");
            false
        }
        Err(_) => {
            debug!(probe, "Capability probe panicked, treating as unsupported");
            false
        }
    }
}
