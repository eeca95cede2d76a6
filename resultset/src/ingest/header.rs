//! Header decoding
//!
//! Turns the fixed 5-row header block into an explicit [`ColumnMapping`]. The
//! mapping is the only thing the row stages see of the header, so all of the
//! export's positional conventions live in this file.
//!
//! ```text
//! row 1  label block per benchmark-scenario group   (not consulted)
//! row 2  -                                           (not consulted)
//! row 3  benchmark name     llama2-70b-99   llama2-70b-99
//! row 4  scenario           Offline         Server
//! row 5  column label       Tokens/s        Tokens/s      Public ID ...
//! ```

use super::table::{cell, Row};
use crate::error::{IngestError, IngestResult};
use crate::types::{Scenario, Unit};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Rows in the header block.
pub const HEADER_ROWS: usize = 5;

const BENCHMARK_ROW: usize = 2;
const SCENARIO_ROW: usize = 3;
const LABEL_ROW: usize = 4;

/// Discriminator column used when no header label names it.
pub const DEFAULT_DISCRIMINATOR_COLUMN: usize = 14;

/// Metadata fields recognized by their row-5 label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    PublicId,
    Organization,
    SystemName,
    Accelerator,
    AcceleratorCount,
    NodeCount,
    ProcessorCount,
    /// Column telling the rows of a submission block apart
    Discriminator,
}

impl MetadataField {
    /// Recognize a metadata column from its label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        match label.as_str() {
            "public id" => Some(Self::PublicId),
            "organization" => Some(Self::Organization),
            "accelerator" => Some(Self::Accelerator),
            "# of accelerators" => Some(Self::AcceleratorCount),
            "# of nodes" => Some(Self::NodeCount),
            "# of processors" => Some(Self::ProcessorCount),
            "measure names" | "result type" => Some(Self::Discriminator),
            other if other.starts_with("system name") => Some(Self::SystemName),
            _ => None,
        }
    }

    /// Canonical label, used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::PublicId => "Public ID",
            Self::Organization => "Organization",
            Self::SystemName => "System Name",
            Self::Accelerator => "Accelerator",
            Self::AcceleratorCount => "# of Accelerators",
            Self::NodeCount => "# of Nodes",
            Self::ProcessorCount => "# of Processors",
            Self::Discriminator => "Measure Names",
        }
    }
}

/// A metric column: which benchmark, scenario and unit its cells measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricColumn {
    pub benchmark: String,
    pub scenario: Scenario,
    pub unit: Unit,
}

/// Classification of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Metadata(MetadataField),
    Metric(MetricColumn),
    Ignored,
}

/// Header decoding options.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOptions {
    /// Blank benchmark/scenario cells inherit the value to their left
    pub fill_merged_headers: bool,
}

/// Column position → meaning, built once per ingestion run.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    columns: Vec<ColumnKind>,
    metadata: BTreeMap<MetadataField, usize>,
    discriminator: usize,
    /// Benchmarks in first-seen column order
    benchmark_order: Vec<String>,
    declared_units: HashMap<(String, Scenario), Unit>,
}

impl ColumnMapping {
    /// Decode the header block.
    ///
    /// Fails fast when the block is short, has no public id column, or
    /// declares one benchmark/scenario pair under two units.
    pub fn decode(header_rows: &[Row], options: HeaderOptions) -> IngestResult<Self> {
        if header_rows.len() < HEADER_ROWS {
            return Err(IngestError::MissingHeader {
                expected: HEADER_ROWS,
                found: header_rows.len(),
            });
        }

        let benchmarks = &header_rows[BENCHMARK_ROW];
        let scenarios = &header_rows[SCENARIO_ROW];
        let labels = &header_rows[LABEL_ROW];
        let width = header_rows[..HEADER_ROWS]
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut mapping = Self {
            columns: Vec::with_capacity(width),
            metadata: BTreeMap::new(),
            discriminator: DEFAULT_DISCRIMINATOR_COLUMN,
            benchmark_order: Vec::new(),
            declared_units: HashMap::new(),
        };

        let mut carried_benchmark = String::new();
        let mut carried_scenario = String::new();

        for column in 0..width {
            let label = cell(labels, column).trim();

            let kind = if let Some(unit) = Unit::from_label(label) {
                let mut benchmark = cell(benchmarks, column).trim();
                let mut scenario = cell(scenarios, column).trim();
                if options.fill_merged_headers {
                    if benchmark.is_empty() {
                        benchmark = &carried_benchmark;
                    } else {
                        carried_benchmark = benchmark.to_string();
                    }
                    if scenario.is_empty() {
                        scenario = &carried_scenario;
                    } else {
                        carried_scenario = scenario.to_string();
                    }
                }
                let (benchmark, scenario) = (benchmark.to_string(), scenario.to_string());
                mapping.classify_metric(column, benchmark, &scenario, unit)?
            } else if let Some(field) = MetadataField::from_label(label) {
                if mapping.metadata.contains_key(&field) {
                    debug!(column, label, "Repeated metadata column ignored");
                    ColumnKind::Ignored
                } else {
                    mapping.metadata.insert(field, column);
                    ColumnKind::Metadata(field)
                }
            } else {
                ColumnKind::Ignored
            };

            mapping.columns.push(kind);
        }

        if !mapping.metadata.contains_key(&MetadataField::PublicId) {
            return Err(IngestError::missing_column(MetadataField::PublicId.label()));
        }
        if let Some(&column) = mapping.metadata.get(&MetadataField::Discriminator) {
            mapping.discriminator = column;
        }

        info!(
            columns = width,
            metric_columns = mapping.metric_columns().count(),
            benchmarks = mapping.benchmark_order.len(),
            discriminator = mapping.discriminator,
            "Decoded header"
        );

        Ok(mapping)
    }

    fn classify_metric(
        &mut self,
        column: usize,
        benchmark: String,
        scenario: &str,
        unit: Unit,
    ) -> IngestResult<ColumnKind> {
        if benchmark.is_empty() || scenario.is_empty() {
            debug!(column, "Unit column without benchmark/scenario ignored");
            return Ok(ColumnKind::Ignored);
        }
        let scenario = match scenario.parse::<Scenario>() {
            Ok(scenario) => scenario,
            Err(reason) => {
                warn!(column, benchmark = %benchmark, %reason, "Metric column ignored");
                return Ok(ColumnKind::Ignored);
            }
        };

        let key = (benchmark.clone(), scenario);
        match self.declared_units.get(&key) {
            Some(&first) if first != unit => {
                return Err(IngestError::HeaderInconsistency {
                    benchmark,
                    scenario,
                    first,
                    second: unit,
                    column,
                });
            }
            Some(_) => {}
            None => {
                self.declared_units.insert(key, unit);
            }
        }
        if !self.benchmark_order.contains(&benchmark) {
            self.benchmark_order.push(benchmark.clone());
        }

        Ok(ColumnKind::Metric(MetricColumn {
            benchmark,
            scenario,
            unit,
        }))
    }

    /// Classification of a column; columns past the header width are ignored.
    pub fn kind(&self, column: usize) -> &ColumnKind {
        self.columns.get(column).unwrap_or(&ColumnKind::Ignored)
    }

    /// Number of columns the header spans.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column carrying a metadata field.
    pub fn column_of(&self, field: MetadataField) -> Option<usize> {
        self.metadata.get(&field).copied()
    }

    pub fn public_id_column(&self) -> usize {
        // Presence is checked in `decode`.
        self.metadata
            .get(&MetadataField::PublicId)
            .copied()
            .unwrap_or_default()
    }

    pub fn discriminator_column(&self) -> usize {
        self.discriminator
    }

    /// Metadata columns in column order.
    pub fn metadata_columns(&self) -> impl Iterator<Item = (usize, MetadataField)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(column, kind)| match kind {
                ColumnKind::Metadata(field) => Some((column, *field)),
                _ => None,
            })
    }

    /// Metric columns in column order.
    pub fn metric_columns(&self) -> impl Iterator<Item = (usize, &MetricColumn)> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(column, kind)| match kind {
                ColumnKind::Metric(metric) => Some((column, metric)),
                _ => None,
            })
    }

    /// Benchmark names in first-seen column order.
    pub fn benchmark_order(&self) -> &[String] {
        &self.benchmark_order
    }

    /// Unit the header declares for a benchmark/scenario pair.
    pub fn declared_unit(&self, benchmark: &str, scenario: Scenario) -> Option<Unit> {
        self.declared_units
            .get(&(benchmark.to_string(), scenario))
            .copied()
    }

    /// First unit declared, in column order, for one of `supported`.
    pub fn headline_unit(&self, benchmark: &str, supported: &[Scenario]) -> Option<Unit> {
        self.metric_columns()
            .find(|(_, metric)| {
                metric.benchmark == benchmark && supported.contains(&metric.scenario)
            })
            .map(|(_, metric)| metric.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Row> {
        lines
            .iter()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn header(benchmarks: &[&str], scenarios: &[&str], labels: &[&str]) -> Vec<Row> {
        rows(&[&["group"], &[], benchmarks, scenarios, labels])
    }

    #[test]
    fn test_decode_metadata_and_metrics() {
        let header = header(
            &["", "", "", "llama2-70b-99", "llama2-70b-99"],
            &["", "", "", "Offline", "Server"],
            &["Public ID", "Organization", "System Name (click + for details)", "Tokens/s", "Tokens/s"],
        );
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();

        assert_eq!(mapping.width(), 5);
        assert_eq!(mapping.public_id_column(), 0);
        assert_eq!(mapping.column_of(MetadataField::Organization), Some(1));
        assert_eq!(mapping.column_of(MetadataField::SystemName), Some(2));
        assert_eq!(
            mapping.kind(3),
            &ColumnKind::Metric(MetricColumn {
                benchmark: "llama2-70b-99".to_string(),
                scenario: Scenario::Offline,
                unit: Unit::TokensPerSecond,
            })
        );
        assert_eq!(mapping.metric_columns().count(), 2);
        assert_eq!(mapping.kind(99), &ColumnKind::Ignored);
        assert_eq!(mapping.discriminator_column(), DEFAULT_DISCRIMINATOR_COLUMN);
    }

    #[test]
    fn test_discriminator_label_overrides_default() {
        let header = header(&[], &[], &["Public ID", "Measure Names"]);
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();
        assert_eq!(mapping.discriminator_column(), 1);
    }

    #[test]
    fn test_blank_benchmark_or_scenario_is_ignored() {
        let header = header(
            &["", "bert-99", "", "bert-99"],
            &["", "Offline", "Server", ""],
            &["Public ID", "Samples/s", "Samples/s", "Queries/s"],
        );
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();
        assert!(matches!(mapping.kind(1), ColumnKind::Metric(_)));
        assert_eq!(mapping.kind(2), &ColumnKind::Ignored);
        assert_eq!(mapping.kind(3), &ColumnKind::Ignored);
    }

    #[test]
    fn test_non_unit_label_is_ignored_even_with_benchmark() {
        let header = header(
            &["", "bert-99"],
            &["", "Offline"],
            &["Public ID", "Accuracy"],
        );
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();
        assert_eq!(mapping.kind(1), &ColumnKind::Ignored);
        assert!(mapping.benchmark_order().is_empty());
    }

    #[test]
    fn test_fill_merged_headers_carries_left_value() {
        let header = header(
            &["", "bert-99", ""],
            &["", "Offline", "Server"],
            &["Public ID", "Samples/s", "Queries/s"],
        );
        let mapping = ColumnMapping::decode(
            &header,
            HeaderOptions {
                fill_merged_headers: true,
            },
        )
        .unwrap();
        match mapping.kind(2) {
            ColumnKind::Metric(metric) => {
                assert_eq!(metric.benchmark, "bert-99");
                assert_eq!(metric.scenario, Scenario::Server);
                assert_eq!(metric.unit, Unit::QueriesPerSecond);
            }
            other => panic!("expected metric column, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_units_fail_fast() {
        let header = header(
            &["", "resnet", "resnet"],
            &["", "Server", "Server"],
            &["Public ID", "Queries/s", "Samples/s"],
        );
        let err = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap_err();
        match err {
            IngestError::HeaderInconsistency {
                benchmark,
                scenario,
                first,
                second,
                column,
            } => {
                assert_eq!(benchmark, "resnet");
                assert_eq!(scenario, Scenario::Server);
                assert_eq!(first, Unit::QueriesPerSecond);
                assert_eq!(second, Unit::SamplesPerSecond);
                assert_eq!(column, 2);
            }
            other => panic!("expected header inconsistency, got {other:?}"),
        }
    }

    #[test]
    fn test_units_may_differ_across_scenarios() {
        let header = header(
            &["", "resnet", "resnet"],
            &["", "Offline", "Server"],
            &["Public ID", "Samples/s", "Queries/s"],
        );
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();
        assert_eq!(
            mapping.headline_unit("resnet", &Scenario::CANONICAL),
            Some(Unit::SamplesPerSecond)
        );
        assert_eq!(
            mapping.headline_unit("resnet", &[Scenario::Server]),
            Some(Unit::QueriesPerSecond)
        );
        assert_eq!(mapping.headline_unit("resnet", &[]), None);
        assert_eq!(
            mapping.declared_unit("resnet", Scenario::Server),
            Some(Unit::QueriesPerSecond)
        );
    }

    #[test]
    fn test_unknown_scenario_is_ignored() {
        let header = header(
            &["", "retinanet"],
            &["", "SingleStream"],
            &["Public ID", "Samples/s"],
        );
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();
        assert_eq!(mapping.kind(1), &ColumnKind::Ignored);
    }

    #[test]
    fn test_benchmark_order_is_first_seen() {
        let header = header(
            &["", "zeta", "alpha", "zeta"],
            &["", "Offline", "Offline", "Server"],
            &["Public ID", "Samples/s", "Samples/s", "Samples/s"],
        );
        let mapping = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap();
        assert_eq!(mapping.benchmark_order(), ["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn test_short_header_block() {
        let header = rows(&[&["a"], &["b"]]);
        let err = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingHeader {
                expected: 5,
                found: 2
            }
        ));
    }

    #[test]
    fn test_missing_public_id_column() {
        let header = header(&[], &[], &["Organization", "Accelerator"]);
        let err = ColumnMapping::decode(&header, HeaderOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { .. }));
    }
}
