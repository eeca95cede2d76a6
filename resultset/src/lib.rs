//! Benchmark Result-Set Library
//!
//! This library provides:
//! - An ingestion pipeline for MLPerf-Inference style crosstab exports
//!   (multi-row header, four rows per submission)
//! - A typed, immutable snapshot of benchmarks and systems, written as a JSON
//!   artifact
//! - A query layer: filter by benchmark, rank by metric, paginate
//!
//! # Pipeline
//!
//! ```text
//! bytes ─► encoding ─► table ─► header ─► grouper ─► entity ─► catalog ─► Snapshot
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use resultset::{ingest_file, IngestConfig, ViewState};
//!
//! let ingestion = ingest_file("inference51results.csv", &IngestConfig::default())?;
//! let page = ingestion.snapshot.query().run(&ViewState::default());
//! for row in &page.rows {
//!     println!("{} {} {:?}", row.rank, row.system.system_name, row.value);
//! }
//! # Ok::<(), resultset::IngestError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod query;
pub mod snapshot;
pub mod types;
pub mod validate;

pub use config::IngestConfig;
pub use error::{IngestError, IngestResult, Stage};
pub use ingest::{ingest_bytes, ingest_file, Encoding, IngestReport, Ingestion};
pub use query::{PageSize, QueryEngine, QueryResult, RankedSystem, SortKey, ViewState};
pub use snapshot::{SharedSnapshotCell, Snapshot, SnapshotCell, SnapshotError, SnapshotMetadata};
pub use types::{Benchmark, Scenario, System, Unit};
pub use validate::{validate_json, validate_snapshot, ValidationReport};
