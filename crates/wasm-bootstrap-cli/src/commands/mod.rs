//! CLI command handlers
//!
//! # Modules
//!
//! - `probe`: Capability probing against the local engine
//! - `variant`: Variant name lookup
//! - `init`: Runtime initialization through the global accessors

pub mod init;
pub mod probe;
pub mod variant;
