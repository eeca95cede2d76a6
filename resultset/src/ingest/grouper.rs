//! Record grouping
//!
//! Data rows arrive in blocks of four per submission, one row per measure:
//!
//! ```text
//! 5.1-0001 ... # of Processors             <- processor count
//! 5.1-0001 ... # of Accelerators           <- accelerator count
//! 5.1-0001 ... # of Nodes                  <- node count
//! 5.1-0001 ... Avg. Result at System Name  <- metric values (authoritative)
//! ```
//!
//! Each well-formed block yields one [`SubmissionRecord`]: the aggregate row
//! plus the count cells harvested from its siblings. Malformed blocks are
//! skipped and reported; they never stop the rest of the table.

use super::header::{ColumnMapping, MetadataField};
use super::report::RowGroupError;
use super::table::{cell, is_blank, Row};
use std::collections::HashSet;
use tracing::warn;

/// Rows per submission block.
pub const BLOCK_SIZE: usize = 4;

/// Discriminator prefix of the row carrying metric values.
pub const AGGREGATE_MARKER: &str = "Avg. Result";

/// Role of a row within a submission block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    Processors,
    Accelerators,
    Nodes,
    Aggregate,
    Other,
}

impl RowRole {
    /// Classify a row by its discriminator cell.
    pub fn classify(discriminator: &str) -> Self {
        let value = discriminator.trim().to_ascii_lowercase();
        match value.as_str() {
            "# of processors" => Self::Processors,
            "# of accelerators" => Self::Accelerators,
            "# of nodes" => Self::Nodes,
            v if v.contains(&AGGREGATE_MARKER.to_ascii_lowercase()) => Self::Aggregate,
            _ => Self::Other,
        }
    }

    /// Count field a measure row supplies.
    fn count_field(self) -> Option<MetadataField> {
        match self {
            Self::Processors => Some(MetadataField::ProcessorCount),
            Self::Accelerators => Some(MetadataField::AcceleratorCount),
            Self::Nodes => Some(MetadataField::NodeCount),
            Self::Aggregate | Self::Other => None,
        }
    }
}

/// Raw count cells harvested from a block, trimmed and non-empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountCells<'r> {
    pub accelerators: Option<&'r str>,
    pub nodes: Option<&'r str>,
    pub processors: Option<&'r str>,
}

/// One accepted submission block.
#[derive(Debug, Clone)]
pub struct SubmissionRecord<'r> {
    pub public_id: &'r str,
    /// 1-based table row of the aggregate row
    pub row: usize,
    pub aggregate: &'r [String],
    pub counts: CountCells<'r>,
}

/// Output of grouping: accepted records plus the blocks that were skipped.
#[derive(Debug, Default)]
pub struct Grouping<'r> {
    pub records: Vec<SubmissionRecord<'r>>,
    pub skipped: Vec<RowGroupError>,
    /// Non-blank data rows seen
    pub data_rows: usize,
}

/// Group data rows into submission blocks.
///
/// `first_row` is the 1-based table row number of `rows[0]`, used only in
/// diagnostics.
pub fn group_records<'r>(
    rows: &'r [Row],
    mapping: &ColumnMapping,
    first_row: usize,
) -> Grouping<'r> {
    let id_column = mapping.public_id_column();
    let discriminator = mapping.discriminator_column();

    let rows: Vec<(usize, &'r Row)> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_blank(row))
        .map(|(index, row)| (first_row + index, row))
        .collect();

    let mut grouping = Grouping {
        data_rows: rows.len(),
        ..Grouping::default()
    };
    let mut seen: HashSet<&'r str> = HashSet::new();

    let mut start = 0;
    while start < rows.len() {
        let (row_number, first) = rows[start];
        let id = public_id_of(first, id_column);

        if id.is_empty() {
            let count = rows[start..]
                .iter()
                .take_while(|(_, row)| public_id_of(row, id_column).is_empty())
                .count();
            skip(&mut grouping, RowGroupError::MissingPublicId { row: row_number, count });
            start += count;
            continue;
        }

        let end = (start + BLOCK_SIZE).min(rows.len());
        let window = &rows[start..end];
        let run = window
            .iter()
            .take_while(|(_, row)| public_id_of(row, id_column) == id)
            .count();

        if run < window.len() {
            let resumes = window[run..]
                .iter()
                .any(|(_, row)| public_id_of(row, id_column) == id);
            if resumes {
                // A foreign row inside the block: the whole window is one
                // damaged submission.
                let mut ids: Vec<&str> = window
                    .iter()
                    .map(|(_, row)| public_id_of(row, id_column))
                    .collect();
                ids.dedup();
                skip(
                    &mut grouping,
                    RowGroupError::MixedPublicIds {
                        row: row_number,
                        ids: ids.join(", "),
                    },
                );
                start = end;
                continue;
            }

            let has_aggregate = window[..run]
                .iter()
                .any(|(_, row)| role_of(row, discriminator) == RowRole::Aggregate);
            let issue = if has_aggregate {
                RowGroupError::TruncatedBlock {
                    row: row_number,
                    found: run,
                    expected: BLOCK_SIZE,
                }
            } else {
                RowGroupError::MissingAggregate {
                    public_id: id.to_string(),
                    row: row_number,
                }
            };
            skip(&mut grouping, issue);
            start += run;
            continue;
        }

        start = end;

        if window.len() < BLOCK_SIZE {
            skip(
                &mut grouping,
                RowGroupError::TruncatedBlock {
                    row: row_number,
                    found: window.len(),
                    expected: BLOCK_SIZE,
                },
            );
            continue;
        }

        let Some(&(aggregate_row, aggregate)) =
            window.iter().find(|(_, row)| role_of(row, discriminator) == RowRole::Aggregate)
        else {
            skip(
                &mut grouping,
                RowGroupError::MissingAggregate {
                    public_id: id.to_string(),
                    row: row_number,
                },
            );
            continue;
        };

        if !seen.insert(id) {
            skip(
                &mut grouping,
                RowGroupError::DuplicateSubmission {
                    public_id: id.to_string(),
                    row: row_number,
                },
            );
            continue;
        }

        let mut counts = CountCells::default();
        for &(_, row) in window {
            let row_role = role_of(row, discriminator);
            let Some(field) = row_role.count_field() else {
                continue;
            };
            let harvested = mapping
                .column_of(field)
                .map(|column| cell(row, column).trim())
                .filter(|value| !value.is_empty());
            let slot = match row_role {
                RowRole::Accelerators => &mut counts.accelerators,
                RowRole::Nodes => &mut counts.nodes,
                _ => &mut counts.processors,
            };
            if slot.is_none() {
                *slot = harvested;
            }
        }
        fill_from_aggregate(&mut counts, aggregate, mapping);

        grouping.records.push(SubmissionRecord {
            public_id: id,
            row: aggregate_row,
            aggregate,
            counts,
        });
    }

    grouping
}

fn public_id_of(row: &[String], column: usize) -> &str {
    cell(row, column).trim()
}

fn role_of(row: &[String], discriminator: usize) -> RowRole {
    RowRole::classify(cell(row, discriminator))
}

fn skip(grouping: &mut Grouping<'_>, issue: RowGroupError) {
    warn!(row = issue.row(), "Skipping block: {}", issue);
    grouping.skipped.push(issue);
}

/// Counts missing from their measure row fall back to the aggregate row.
fn fill_from_aggregate<'r>(
    counts: &mut CountCells<'r>,
    aggregate: &'r [String],
    mapping: &ColumnMapping,
) {
    let from_aggregate = |field: MetadataField| {
        mapping
            .column_of(field)
            .map(|column| cell(aggregate, column).trim())
            .filter(|value| !value.is_empty())
    };
    counts.accelerators = counts
        .accelerators
        .or_else(|| from_aggregate(MetadataField::AcceleratorCount));
    counts.nodes = counts.nodes.or_else(|| from_aggregate(MetadataField::NodeCount));
    counts.processors = counts
        .processors
        .or_else(|| from_aggregate(MetadataField::ProcessorCount));
}
