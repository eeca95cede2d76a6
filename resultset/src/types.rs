//! Core entity types
//!
//! `Benchmark` and `System` are the two entities a snapshot carries. Both are
//! built once per ingestion run and never mutated once the snapshot exists.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Unit keyword at the end of a metric column label, e.g. `Tokens/s`.
static UNIT_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(samples|queries|tokens)\s*/\s*s(?:ec(?:ond)?)?\s*$")
        .expect("UNIT_LABEL_RE regex should compile")
});

// ============================================================================
// Scenario
// ============================================================================

/// Operating mode of a benchmark.
///
/// Variant order is the canonical presentation order; `Ord` follows it, so any
/// ordered collection of scenarios comes out as Offline, Server, Interactive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Scenario {
    /// Maximum throughput, no latency bound
    Offline,
    /// Latency-bounded throughput under a query arrival process
    Server,
    /// Server with tighter latency targets
    Interactive,
}

impl Scenario {
    /// All scenarios in canonical order.
    pub const CANONICAL: [Scenario; 3] = [Scenario::Offline, Scenario::Server, Scenario::Interactive];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "Offline",
            Self::Server => "Server",
            Self::Interactive => "Interactive",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::CANONICAL
            .into_iter()
            .find(|scenario| scenario.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown scenario '{trimmed}'"))
    }
}

// ============================================================================
// Unit
// ============================================================================

/// Unit of measure for a benchmark result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Unit {
    #[serde(rename = "Samples/s")]
    SamplesPerSecond,
    #[serde(rename = "Queries/s")]
    QueriesPerSecond,
    #[serde(rename = "Tokens/s")]
    TokensPerSecond,
}

impl Unit {
    /// Recognize a unit from a column label.
    ///
    /// Matches the keyword as a suffix, ignoring case and whitespace around the
    /// slash: `Tokens/s`, `tokens / sec` and `Avg Samples/second` all match.
    pub fn from_label(label: &str) -> Option<Self> {
        let caps = UNIT_LABEL_RE.captures(label.trim())?;
        match caps[1].to_ascii_lowercase().as_str() {
            "samples" => Some(Self::SamplesPerSecond),
            "queries" => Some(Self::QueriesPerSecond),
            "tokens" => Some(Self::TokensPerSecond),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SamplesPerSecond => "Samples/s",
            Self::QueriesPerSecond => "Queries/s",
            Self::TokensPerSecond => "Tokens/s",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Benchmark
// ============================================================================

/// A named workload with its supported scenarios and unit of measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Benchmark {
    /// Benchmark name, unique within a snapshot
    pub name: String,
    /// Scenarios with at least one measured value, canonical order
    pub scenarios: Vec<Scenario>,
    /// Headline unit (first unit the header declares for a supported scenario)
    pub unit: Unit,
    /// Scenarios whose declared unit differs from the headline unit
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scenario_units: BTreeMap<Scenario, Unit>,
}

impl Benchmark {
    pub fn supports(&self, scenario: Scenario) -> bool {
        self.scenarios.contains(&scenario)
    }

    /// Unit for a scenario, falling back to the headline unit.
    pub fn unit_for(&self, scenario: Scenario) -> Unit {
        self.scenario_units
            .get(&scenario)
            .copied()
            .unwrap_or(self.unit)
    }

    /// First supported scenario, if any.
    pub fn primary_scenario(&self) -> Option<Scenario> {
        self.scenarios.first().copied()
    }
}

// ============================================================================
// System
// ============================================================================

/// Results for one benchmark: scenario → value, `None` meaning not measured.
pub type ScenarioResults = BTreeMap<Scenario, Option<f64>>;

/// Results for one system: benchmark name → scenario results.
pub type ResultsMap = BTreeMap<String, ScenarioResults>;

/// One submitted system and its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct System {
    /// Public submission id, unique within a snapshot
    pub public_id: String,
    pub organization: String,
    /// Display name
    pub system_name: String,
    /// Accelerator description, `N/A` when the export leaves it blank
    pub accelerator: String,
    pub num_accelerators: Option<u32>,
    pub num_nodes: Option<u32>,
    pub num_processors: Option<u32>,
    pub results: ResultsMap,
}

impl System {
    /// Measured value for a benchmark/scenario pair.
    pub fn result(&self, benchmark: &str, scenario: Scenario) -> Option<f64> {
        self.results
            .get(benchmark)
            .and_then(|scenarios| scenarios.get(&scenario))
            .copied()
            .flatten()
    }

    /// Whether any scenario of `benchmark` has a measured value.
    pub fn has_results_for(&self, benchmark: &str) -> bool {
        self.results
            .get(benchmark)
            .is_some_and(|scenarios| scenarios.values().any(Option::is_some))
    }

    /// Whether the system has any measured value at all.
    pub fn has_any_result(&self) -> bool {
        self.results
            .values()
            .any(|scenarios| scenarios.values().any(Option::is_some))
    }

    /// Restrict `results` to the pairs the catalog declares as supported.
    ///
    /// Consumes the draft so the returned value is the final entity.
    pub fn retain_supported(mut self, catalog: &[Benchmark]) -> Self {
        self.results.retain(|name, scenarios| {
            match catalog.iter().find(|benchmark| &benchmark.name == name) {
                Some(benchmark) => {
                    scenarios.retain(|scenario, _| benchmark.supports(*scenario));
                    !scenarios.is_empty()
                }
                None => false,
            }
        });
        self
    }
}
