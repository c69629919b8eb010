//! Tests for the runtime bootstrap.
//!
//! # Test Groups
//!
//! 1. **Manager Tests**: initialize / get_instance / dispose semantics
//! 2. **Race Tests**: timeout vs. instantiation, late results, task panics
//! 3. **Wasmtime Tests**: real engine against on-disk fixtures
//!
//! Lifecycle, probe and selector unit tests live next to their modules.

pub(crate) mod helpers;
mod manager_tests;
