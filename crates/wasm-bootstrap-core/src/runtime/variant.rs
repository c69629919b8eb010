//! Binary variant selection.
//!
//! # Lookup Table
//!
//! | training built | simd | threads | jsep built | Variant |
//! |----------------|------|---------|------------|---------|
//! | yes | * | * | * | `ort-training-wasm-simd` |
//! | no | yes | yes | no | `ort-wasm-simd-threaded` |
//! | no | yes | yes | yes | `ort-wasm-simd-threaded.jsep` |
//! | no | yes | no | no | `ort-wasm-simd` |
//! | no | yes | no | yes | `ort-wasm-simd.jsep` |
//! | no | no | yes | * | `ort-wasm-threaded` |
//! | no | no | no | * | `ort-wasm` |
//!
//! The training variant does not fork on the thread or JSEP axes.

use std::fmt;

use serde::Serialize;

use super::config::BuildFlags;

/// Suffix of the compiled binary.
const WASM_EXTENSION: &str = ".wasm";
/// Suffix of the module factory script.
const FACTORY_EXTENSION: &str = ".mjs";
/// Suffix of the worker bootstrap script.
const WORKER_EXTENSION: &str = ".worker.js";

/// Logical name of a binary variant, without file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VariantName(&'static str);

impl VariantName {
    pub const TRAINING_SIMD: Self = Self("ort-training-wasm-simd");
    pub const SIMD_THREADED: Self = Self("ort-wasm-simd-threaded");
    pub const SIMD_THREADED_JSEP: Self = Self("ort-wasm-simd-threaded.jsep");
    pub const SIMD: Self = Self("ort-wasm-simd");
    pub const SIMD_JSEP: Self = Self("ort-wasm-simd.jsep");
    pub const THREADED: Self = Self("ort-wasm-threaded");
    pub const BASE: Self = Self("ort-wasm");

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// `<variant>.wasm`
    #[must_use]
    pub fn wasm_file_name(&self) -> String {
        format!("{}{}", self.0, WASM_EXTENSION)
    }

    /// `<variant>.mjs`
    #[must_use]
    pub fn factory_file_name(&self) -> String {
        format!("{}{}", self.0, FACTORY_EXTENSION)
    }

    /// `<variant>.worker.js`
    #[must_use]
    pub fn worker_file_name(&self) -> String {
        format!("{}{}", self.0, WORKER_EXTENSION)
    }
}

impl fmt::Display for VariantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Pick the variant for the given capabilities and build configuration.
///
/// First match wins: a training build beats every other axis, then SIMD
/// splits on threads and JSEP, and plain builds split on threads only.
#[must_use]
pub fn select_variant(simd: bool, threads: bool, flags: BuildFlags) -> VariantName {
    if !flags.disable_training {
        return VariantName::TRAINING_SIMD;
    }

    match (simd, threads, flags.disable_jsep) {
        (true, true, true) => VariantName::SIMD_THREADED,
        (true, true, false) => VariantName::SIMD_THREADED_JSEP,
        (true, false, true) => VariantName::SIMD,
        (true, false, false) => VariantName::SIMD_JSEP,
        (false, true, _) => VariantName::THREADED,
        (false, false, _) => VariantName::BASE,
    }
}
