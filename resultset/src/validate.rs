//! Artifact validation
//!
//! Checks a written artifact against the invariants ingestion guarantees, so
//! a hand-edited or stale file is caught before a consumer loads it.

use crate::snapshot::Snapshot;
use crate::types::Scenario;
use serde::Serialize;
use std::collections::HashSet;

/// Top-level keys every artifact carries.
pub const REQUIRED_KEYS: [&str; 3] = ["metadata", "benchmarks", "systems"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

/// Outcome of validating one artifact.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub benchmarks: usize,
    pub systems: usize,
}

impl ValidationReport {
    fn error(&mut self, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    /// No error-level findings.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Warning)
    }

    /// Format as a summary report
    pub fn format_report(&self) -> String {
        let mut report = String::new();
        report.push_str("# Validation Report\n\n");
        report.push_str(&format!(
            "- Benchmarks: {}\n- Systems: {}\n- Errors: {}\n- Warnings: {}\n\n",
            self.benchmarks,
            self.systems,
            self.errors().count(),
            self.warnings().count()
        ));
        for finding in &self.findings {
            let marker = match finding.severity {
                Severity::Error => "✗",
                Severity::Warning => "⚠",
            };
            report.push_str(&format!("{} {}\n", marker, finding.message));
        }
        if self.is_valid() {
            report.push_str("✓ Artifact is valid\n");
        }
        report
    }
}

/// Validate artifact JSON text.
pub fn validate_json(json: &str, default_benchmark: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            report.error(format!("Invalid JSON: {e}"));
            return report;
        }
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .into_iter()
        .filter(|key| value.get(key).is_none())
        .collect();
    if !missing.is_empty() {
        for key in missing {
            report.error(format!("Missing top-level key '{key}'"));
        }
        return report;
    }

    match serde_json::from_value::<Snapshot>(value) {
        Ok(snapshot) => validate_snapshot(&snapshot, default_benchmark),
        Err(e) => {
            report.error(format!("Artifact does not match the schema: {e}"));
            report
        }
    }
}

/// Validate a loaded snapshot.
pub fn validate_snapshot(snapshot: &Snapshot, default_benchmark: &str) -> ValidationReport {
    let mut report = ValidationReport {
        findings: Vec::new(),
        benchmarks: snapshot.benchmarks.len(),
        systems: snapshot.systems.len(),
    };

    let metadata = &snapshot.metadata;
    if metadata.total_systems != snapshot.systems.len() {
        report.error(format!(
            "metadata.total_systems is {} but {} systems are listed",
            metadata.total_systems,
            snapshot.systems.len()
        ));
    }
    if metadata.total_benchmarks != snapshot.benchmarks.len() {
        report.error(format!(
            "metadata.total_benchmarks is {} but {} benchmarks are listed",
            metadata.total_benchmarks,
            snapshot.benchmarks.len()
        ));
    }

    let mut names = HashSet::new();
    for benchmark in &snapshot.benchmarks {
        if !names.insert(benchmark.name.as_str()) {
            report.error(format!("Duplicate benchmark '{}'", benchmark.name));
        }
        if benchmark.scenarios.is_empty() {
            report.error(format!("Benchmark '{}' lists no scenarios", benchmark.name));
        }
        if !is_canonical(&benchmark.scenarios) {
            report.error(format!(
                "Benchmark '{}' scenarios are not in canonical order",
                benchmark.name
            ));
        }
        if !snapshot
            .systems
            .iter()
            .any(|system| system.has_results_for(&benchmark.name))
        {
            report.error(format!("Benchmark '{}' has no results", benchmark.name));
        }
    }

    let mut ids = HashSet::new();
    for system in &snapshot.systems {
        if !ids.insert(system.public_id.as_str()) {
            report.error(format!("Duplicate public id '{}'", system.public_id));
        }
        for (name, scenarios) in &system.results {
            let Some(benchmark) = snapshot.benchmark(name) else {
                report.error(format!(
                    "System '{}' has results for unknown benchmark '{}'",
                    system.public_id, name
                ));
                continue;
            };
            for (scenario, value) in scenarios {
                if !benchmark.supports(*scenario) {
                    report.error(format!(
                        "System '{}' has {}/{} which the benchmark does not support",
                        system.public_id, name, scenario
                    ));
                }
                if let Some(value) = value {
                    if !value.is_finite() || *value <= 0.0 {
                        report.warning(format!(
                            "System '{}' {}/{} has non-positive value {}",
                            system.public_id, name, scenario, value
                        ));
                    }
                }
            }
        }
    }

    if snapshot.benchmark(default_benchmark).is_none() {
        report.warning(format!(
            "Default benchmark '{default_benchmark}' is not present"
        ));
    }

    report
}

fn is_canonical(scenarios: &[Scenario]) -> bool {
    scenarios.windows(2).all(|pair| pair[0] < pair[1])
}
