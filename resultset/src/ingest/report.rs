//! Recovered ingestion problems and the per-run report
//!
//! Row- and cell-level problems never abort a run. They are logged when they
//! happen and collected here so callers can show what was skipped.

use super::encoding::Encoding;
use serde::Serialize;
use thiserror::Error;

/// A submission block that was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowGroupError {
    /// Rows of one block carry different public ids
    #[error("Row {row}: block rows do not share one public id ({ids})")]
    MixedPublicIds { row: usize, ids: String },

    /// No row of the block carries the aggregate result
    #[error("Row {row}: block for '{public_id}' has no aggregate-result row")]
    MissingAggregate { public_id: String, row: usize },

    /// Rows without a public id cannot be grouped
    #[error("Row {row}: {count} row(s) without a public id")]
    MissingPublicId { row: usize, count: usize },

    /// Block ends early, at end of input or where the next submission starts
    #[error("Row {row}: block has {found} of {expected} rows")]
    TruncatedBlock {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// Public id already accepted from an earlier block
    #[error("Row {row}: duplicate submission '{public_id}'")]
    DuplicateSubmission { public_id: String, row: usize },
}

impl RowGroupError {
    /// 1-based table row the skipped block starts at
    pub fn row(&self) -> usize {
        match self {
            Self::MixedPublicIds { row, .. }
            | Self::MissingAggregate { row, .. }
            | Self::MissingPublicId { row, .. }
            | Self::TruncatedBlock { row, .. }
            | Self::DuplicateSubmission { row, .. } => *row,
        }
    }
}

/// What kind of cell failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Count,
    Metric,
}

/// A cell that could not be parsed; the value was defaulted to absent.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{public_id}: column {column} ({field}) has unparseable value '{raw}'")]
pub struct FieldParseError {
    pub public_id: String,
    pub column: usize,
    /// Column label or `benchmark/scenario`
    pub field: String,
    pub kind: FieldKind,
    pub raw: String,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub encoding: Encoding,
    /// Non-blank data rows after the header block
    pub data_rows: usize,
    /// Systems in the final snapshot
    pub systems_built: usize,
    pub benchmarks: usize,
    pub skipped_blocks: Vec<RowGroupError>,
    pub field_issues: Vec<FieldParseError>,
    /// Public ids dropped for carrying no result at all
    pub without_results: Vec<String>,
}

impl IngestReport {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            data_rows: 0,
            systems_built: 0,
            benchmarks: 0,
            skipped_blocks: Vec::new(),
            field_issues: Vec::new(),
            without_results: Vec::new(),
        }
    }

    /// Whether every block and cell was used as-is.
    pub fn is_clean(&self) -> bool {
        self.skipped_blocks.is_empty() && self.field_issues.is_empty()
    }

    /// Format as a summary report
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("# Ingestion Report\n\n");
        report.push_str(&format!(
            "| Metric | Value |\n\
             |--------|-------|\n\
             | Encoding | {} |\n\
             | Data Rows | {} |\n\
             | Systems | {} |\n\
             | Benchmarks | {} |\n\
             | Skipped Blocks | {} |\n\
             | Field Issues | {} |\n\
             | Without Results | {} |\n\n",
            self.encoding,
            self.data_rows,
            self.systems_built,
            self.benchmarks,
            self.skipped_blocks.len(),
            self.field_issues.len(),
            self.without_results.len()
        ));

        if !self.skipped_blocks.is_empty() {
            report.push_str("## Skipped Blocks\n\n");
            for issue in &self.skipped_blocks {
                report.push_str(&format!("- {issue}\n"));
            }
            report.push('\n');
        }

        if !self.field_issues.is_empty() {
            report.push_str("## Field Issues\n\n");
            for issue in &self.field_issues {
                report.push_str(&format!("- {issue}\n"));
            }
            report.push('\n');
        }

        report
    }
}
