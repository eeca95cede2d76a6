//! Command-line support for the `resultset` binary
//!
//! Config layering and terminal rendering live here so they can be tested
//! without spawning the binary.

pub mod config;
pub mod render;

pub use config::{resolve_ingest_config, IngestOverrides};
