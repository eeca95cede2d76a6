//! Entity building
//!
//! Converts one accepted [`SubmissionRecord`] into a draft [`System`] using the
//! column mapping. Bad cells degrade to absent values; only a missing public
//! id rejects the row.

use super::grouper::SubmissionRecord;
use super::header::{ColumnMapping, MetadataField};
use super::report::{FieldKind, FieldParseError, RowGroupError};
use super::table::cell;
use crate::types::{ResultsMap, System};
use tracing::warn;

/// Accelerator description used when the export leaves it blank.
pub const UNKNOWN_ACCELERATOR: &str = "N/A";

/// Parse a decimal cell, stripping grouping commas.
///
/// Empty, non-numeric and non-finite text is absent, never zero.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parse an integer count cell; integral decimals such as `8.0` are accepted.
pub fn parse_count(raw: &str) -> Option<u32> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<u32>().ok().or_else(|| {
        parse_number(&cleaned)
            .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= u32::MAX as f64)
            .map(|value| value as u32)
    })
}

/// Build the draft system for one submission record.
///
/// Unparseable cells are pushed to `issues` and defaulted to absent.
pub fn build_system(
    record: &SubmissionRecord<'_>,
    mapping: &ColumnMapping,
    issues: &mut Vec<FieldParseError>,
) -> Result<System, RowGroupError> {
    let row = record.aggregate;
    let public_id = cell(row, mapping.public_id_column()).trim();
    if public_id.is_empty() {
        return Err(RowGroupError::MissingPublicId {
            row: record.row,
            count: 1,
        });
    }

    let text = |field: MetadataField| {
        mapping
            .column_of(field)
            .map(|column| cell(row, column).trim().to_string())
            .unwrap_or_default()
    };

    let mut count = |field: MetadataField, raw: Option<&str>| {
        let raw = raw?;
        let parsed = parse_count(raw);
        if parsed.is_none() {
            let issue = FieldParseError {
                public_id: public_id.to_string(),
                column: mapping.column_of(field).unwrap_or_default(),
                field: field.label().to_string(),
                kind: FieldKind::Count,
                raw: raw.to_string(),
            };
            warn!(public_id, field = field.label(), raw, "Unparseable count defaulted to absent");
            issues.push(issue);
        }
        parsed
    };

    let num_accelerators = count(MetadataField::AcceleratorCount, record.counts.accelerators);
    let num_nodes = count(MetadataField::NodeCount, record.counts.nodes);
    let num_processors = count(MetadataField::ProcessorCount, record.counts.processors);

    let mut results = ResultsMap::new();
    for (column, metric) in mapping.metric_columns() {
        let raw = cell(row, column).trim();
        let value = parse_number(raw);
        if value.is_none() && !raw.is_empty() {
            warn!(
                public_id,
                benchmark = %metric.benchmark,
                scenario = %metric.scenario,
                raw,
                "Unparseable metric treated as absent"
            );
            issues.push(FieldParseError {
                public_id: public_id.to_string(),
                column,
                field: format!("{}/{}", metric.benchmark, metric.scenario),
                kind: FieldKind::Metric,
                raw: raw.to_string(),
            });
        }

        // Duplicate columns: first measured value in column order wins.
        let slot = results
            .entry(metric.benchmark.clone())
            .or_default()
            .entry(metric.scenario)
            .or_insert(None);
        if slot.is_none() {
            *slot = value;
        }
    }

    let accelerator = text(MetadataField::Accelerator);

    Ok(System {
        public_id: public_id.to_string(),
        organization: text(MetadataField::Organization),
        system_name: text(MetadataField::SystemName),
        accelerator: if accelerator.is_empty() {
            UNKNOWN_ACCELERATOR.to_string()
        } else {
            accelerator
        },
        num_accelerators,
        num_nodes,
        num_processors,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::grouper::CountCells;
    use crate::ingest::header::HeaderOptions;
    use crate::ingest::table::Row;
    use crate::types::Scenario;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("27,803.90"), Some(27803.90));
        assert_eq!(parse_number(" 1,234 "), Some(1234.0));
        assert_eq!(parse_number("1234.56"), Some(1234.56));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("invalid"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("8"), Some(8));
        assert_eq!(parse_count("1,024"), Some(1024));
        assert_eq!(parse_count("8.0"), Some(8));
        assert_eq!(parse_count("8.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("eight"), None);
    }

    fn to_rows(lines: &[&[&str]]) -> Vec<Row> {
        lines
            .iter()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    // 0 Public ID, 1 Organization, 2 System Name, 3 Accelerator, 4 # of Accelerators,
    // 5 llama2/Offline, 6 llama2/Server, 7 llama2/Offline (duplicate)
    fn mapping() -> ColumnMapping {
        let header = to_rows(&[
            &[],
            &[],
            &["", "", "", "", "", "llama2-70b-99", "llama2-70b-99", "llama2-70b-99"],
            &["", "", "", "", "", "Offline", "Server", "Offline"],
            &[
                "Public ID",
                "Organization",
                "System Name",
                "Accelerator",
                "# of Accelerators",
                "Tokens/s",
                "Tokens/s",
                "Tokens/s",
            ],
        ]);
        ColumnMapping::decode(&header, HeaderOptions::default()).unwrap()
    }

    fn record<'r>(row: &'r [String], accelerators: Option<&'r str>) -> SubmissionRecord<'r> {
        SubmissionRecord {
            public_id: "5.1-0001",
            row: 9,
            aggregate: row,
            counts: CountCells {
                accelerators,
                nodes: None,
                processors: None,
            },
        }
    }

    #[test]
    fn test_build_system_copies_metadata_and_results() {
        let mapping = mapping();
        let row: Row = to_rows(&[&[
            " 5.1-0001 ",
            " AMD ",
            "MI300X x8",
            "",
            "",
            "27,803.90",
            "",
            "",
        ]])
        .remove(0);
        let mut issues = Vec::new();

        let system = build_system(&record(&row, Some("8")), &mapping, &mut issues).unwrap();
        assert!(issues.is_empty());
        assert_eq!(system.public_id, "5.1-0001");
        assert_eq!(system.organization, "AMD");
        assert_eq!(system.system_name, "MI300X x8");
        assert_eq!(system.accelerator, UNKNOWN_ACCELERATOR);
        assert_eq!(system.num_accelerators, Some(8));
        assert_eq!(system.num_nodes, None);
        assert_eq!(system.result("llama2-70b-99", Scenario::Offline), Some(27803.90));

        let llama = &system.results["llama2-70b-99"];
        assert_eq!(llama.get(&Scenario::Server), Some(&None));
    }

    #[test]
    fn test_unparseable_cells_become_absent_with_issues() {
        let mapping = mapping();
        let row: Row = to_rows(&[&["5.1-0002", "Org", "sys", "H100", "", "n/a", "fast", "12"]]).remove(0);
        let mut issues = Vec::new();

        let system = build_system(&record(&row, Some("eight")), &mapping, &mut issues).unwrap();
        assert_eq!(system.num_accelerators, None);
        assert_eq!(system.accelerator, "H100");
        // duplicate Offline column supplies the value the first one lacked
        assert_eq!(system.result("llama2-70b-99", Scenario::Offline), Some(12.0));
        assert_eq!(system.result("llama2-70b-99", Scenario::Server), None);

        let kinds: Vec<FieldKind> = issues.iter().map(|issue| issue.kind).collect();
        assert_eq!(kinds, vec![FieldKind::Count, FieldKind::Metric, FieldKind::Metric]);
        assert_eq!(issues[0].field, "# of Accelerators");
        assert_eq!(issues[2].field, "llama2-70b-99/Server");
    }

    #[test]
    fn test_missing_public_id_rejects_row() {
        let mapping = mapping();
        let row: Row = to_rows(&[&["  ", "Org", "sys", "", "", "1", "", ""]]).remove(0);
        let mut issues = Vec::new();

        let err = build_system(&record(&row, None), &mapping, &mut issues).unwrap_err();
        assert_eq!(err, RowGroupError::MissingPublicId { row: 9, count: 1 });
    }
}
