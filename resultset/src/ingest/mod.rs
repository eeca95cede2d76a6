//! Ingestion pipeline
//!
//! Raw export bytes flow strictly downward through the stages:
//!
//! ```text
//! bytes ─► encoding ─► table ─► header ─► grouper ─► entity ─► catalog ─► Snapshot
//! ```
//!
//! Structural problems (undecodable input, a broken header) abort the run
//! with an [`IngestError`](crate::error::IngestError). Row- and cell-level
//! problems are recovered and collected in the [`IngestReport`].

pub mod encoding;
pub mod entity;
pub mod grouper;
pub mod header;
pub mod report;
pub mod table;

pub use encoding::{Decoded, Encoding};
pub use header::{ColumnKind, ColumnMapping, HeaderOptions, MetadataField, MetricColumn};
pub use report::{FieldKind, FieldParseError, IngestReport, RowGroupError};

use crate::catalog;
use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::snapshot::Snapshot;
use grouper::group_records;
use header::HEADER_ROWS;
use std::path::Path;
use tracing::{debug, info};

/// Output of one successful ingestion run.
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub snapshot: Snapshot,
    pub report: IngestReport,
}

/// Ingest a raw export held in memory.
pub fn ingest_bytes(bytes: &[u8], config: &IngestConfig) -> IngestResult<Ingestion> {
    let delimiter = config.delimiter_byte()?;
    let digest = blake3::hash(bytes).to_hex().to_string();

    let decoded = encoding::resolve(bytes, &config.encodings)?;
    let rows = table::split_rows(&decoded.text, delimiter)?;

    let split = HEADER_ROWS.min(rows.len());
    let (header_rows, data_rows) = rows.split_at(split);
    let mapping = ColumnMapping::decode(
        header_rows,
        HeaderOptions {
            fill_merged_headers: config.fill_merged_headers,
        },
    )?;

    let grouping = group_records(data_rows, &mapping, HEADER_ROWS + 1);

    let mut report = IngestReport::new(decoded.encoding);
    report.data_rows = grouping.data_rows;
    report.skipped_blocks = grouping.skipped;

    let mut systems = Vec::with_capacity(grouping.records.len());
    for record in &grouping.records {
        match entity::build_system(record, &mapping, &mut report.field_issues) {
            Ok(system) => {
                if config.require_results && !system.has_any_result() {
                    debug!(public_id = %system.public_id, "System without results dropped");
                    report.without_results.push(system.public_id);
                    continue;
                }
                systems.push(system);
            }
            Err(issue) => report.skipped_blocks.push(issue),
        }
    }

    let (benchmarks, systems) = catalog::assemble(&mapping, systems);
    report.systems_built = systems.len();
    report.benchmarks = benchmarks.len();

    info!(
        encoding = %decoded.encoding,
        systems = report.systems_built,
        benchmarks = report.benchmarks,
        skipped_blocks = report.skipped_blocks.len(),
        field_issues = report.field_issues.len(),
        "Ingestion complete"
    );

    let snapshot = Snapshot::new(benchmarks, systems, config, decoded.encoding, digest);
    Ok(Ingestion { snapshot, report })
}

/// Read and ingest an export file.
pub fn ingest_file(path: impl AsRef<Path>, config: &IngestConfig) -> IngestResult<Ingestion> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "Read export");
    ingest_bytes(&bytes, config)
}
