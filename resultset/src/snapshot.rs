//! Snapshot artifact
//!
//! The immutable result of one ingestion run and its JSON form. Consumers
//! read the artifact once and run queries against it; a new ingestion run
//! replaces the whole snapshot.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::ingest::encoding::Encoding;
use crate::ingest::{ingest_bytes, IngestReport};
use crate::query::QueryEngine;
use crate::types::{Benchmark, System};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Artifact format of `metadata.generated_date`.
pub const GENERATED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Error type for snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Provenance and totals of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotMetadata {
    /// Result-round version, e.g. `5.1`
    pub version: String,
    /// Generation time, `%Y-%m-%d %H:%M:%S`
    pub generated_date: String,
    pub total_systems: usize,
    pub total_benchmarks: usize,
    pub description: String,
    /// Encoding the raw export was decoded with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_encoding: Option<Encoding>,
    /// blake3 hex digest of the raw export bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
}

/// The complete, immutable result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub benchmarks: Vec<Benchmark>,
    pub systems: Vec<System>,
}

impl Snapshot {
    /// Assemble a snapshot, filling in metadata totals.
    pub fn new(
        benchmarks: Vec<Benchmark>,
        systems: Vec<System>,
        config: &IngestConfig,
        source_encoding: Encoding,
        source_digest: String,
    ) -> Self {
        Self {
            metadata: SnapshotMetadata {
                version: config.version.clone(),
                generated_date: config
                    .generation_time()
                    .format(GENERATED_DATE_FORMAT)
                    .to_string(),
                total_systems: systems.len(),
                total_benchmarks: benchmarks.len(),
                description: config.description.clone(),
                source_encoding: Some(source_encoding),
                source_digest: Some(source_digest),
            },
            benchmarks,
            systems,
        }
    }

    /// Look up a benchmark by name.
    pub fn benchmark(&self, name: &str) -> Option<&Benchmark> {
        self.benchmarks.iter().find(|benchmark| benchmark.name == name)
    }

    /// Look up a system by public id.
    pub fn system(&self, public_id: &str) -> Option<&System> {
        self.systems.iter().find(|system| system.public_id == public_id)
    }

    /// Query engine over this snapshot.
    pub fn query(&self) -> QueryEngine<'_> {
        QueryEngine::new(self)
    }

    /// JSON Schema of the artifact.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Snapshot)
    }

    /// Serialize as the pretty-printed artifact.
    pub fn to_json_pretty(&self) -> SnapshotResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load an artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Write the artifact: temp file first, then an atomic rename.
    pub fn save(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let temp_path = path.with_extension("json.tmp");
        let io_error = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };

        let content = self.to_json_pretty()?;
        std::fs::write(&temp_path, &content).map_err(io_error)?;
        std::fs::rename(&temp_path, path).map_err(io_error)?;

        info!(
            path = %path.display(),
            systems = self.metadata.total_systems,
            benchmarks = self.metadata.total_benchmarks,
            "Saved snapshot"
        );
        Ok(())
    }
}

/// Shared holder for the current snapshot.
///
/// Readers take an `Arc` and query without holding the lock. Re-ingestion
/// builds the new snapshot off-lock and swaps it in only on success.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
}

/// Shared reference to a SnapshotCell
pub type SharedSnapshotCell = Arc<SnapshotCell>;

impl SnapshotCell {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Create a shared reference to this cell
    pub fn shared(self) -> SharedSnapshotCell {
        Arc::new(self)
    }

    /// The snapshot readers should use right now.
    pub fn current(&self) -> SnapshotResult<Arc<Snapshot>> {
        let guard = self.current.read().map_err(|_| SnapshotError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, snapshot: Snapshot) -> SnapshotResult<Arc<Snapshot>> {
        let mut guard = self.current.write().map_err(|_| SnapshotError::LockPoisoned)?;
        Ok(std::mem::replace(&mut *guard, Arc::new(snapshot)))
    }

    /// Re-ingest `bytes`; the current snapshot is kept if ingestion fails.
    pub fn reingest(&self, bytes: &[u8], config: &IngestConfig) -> SnapshotResult<IngestReport> {
        let ingestion = ingest_bytes(bytes, config)?;
        self.replace(ingestion.snapshot)?;
        Ok(ingestion.report)
    }
}
