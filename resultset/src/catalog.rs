//! Catalog assembly
//!
//! Derives the benchmark catalog from the drafted systems and restricts each
//! system's results to what the catalog supports.

use crate::ingest::header::ColumnMapping;
use crate::types::{Benchmark, Scenario, System};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Build the catalog and the final systems.
///
/// Benchmarks follow first-seen header column order and keep only scenarios
/// with at least one measured value. Benchmarks with no data are left out.
/// The headline unit is the first unit declared for a supported scenario.
pub fn assemble(mapping: &ColumnMapping, systems: Vec<System>) -> (Vec<Benchmark>, Vec<System>) {
    let mut catalog = Vec::with_capacity(mapping.benchmark_order().len());

    for name in mapping.benchmark_order() {
        let scenarios: Vec<Scenario> = Scenario::CANONICAL
            .into_iter()
            .filter(|&scenario| {
                systems
                    .iter()
                    .any(|system| system.result(name, scenario).is_some())
            })
            .collect();

        if scenarios.is_empty() {
            debug!(benchmark = %name, "Benchmark without data omitted from catalog");
            continue;
        }
        let Some(unit) = mapping.headline_unit(name, &scenarios) else {
            continue;
        };

        let scenario_units: BTreeMap<Scenario, _> = scenarios
            .iter()
            .filter_map(|&scenario| {
                mapping
                    .declared_unit(name, scenario)
                    .filter(|&declared| declared != unit)
                    .map(|declared| (scenario, declared))
            })
            .collect();

        catalog.push(Benchmark {
            name: name.clone(),
            scenarios,
            unit,
            scenario_units,
        });
    }

    let systems: Vec<System> = systems
        .into_iter()
        .map(|system| system.retain_supported(&catalog))
        .collect();

    info!(
        benchmarks = catalog.len(),
        systems = systems.len(),
        "Assembled catalog"
    );

    (catalog, systems)
}
