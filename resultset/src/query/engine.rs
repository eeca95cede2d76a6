//! Query engine
//!
//! Pure reads over an immutable snapshot: filter by benchmark, rank by a
//! metric, then window into a page. Nothing here fails on a well-formed
//! snapshot, and results borrow systems rather than copying them.

use super::view::{PageSize, SortKey, ViewState};
use crate::snapshot::Snapshot;
use crate::types::{Benchmark, Scenario, System, Unit};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Divisor used for per-accelerator values when the count is absent or zero.
pub const ACCELERATOR_DIVISOR_FALLBACK: f64 = 1.0;

/// Accelerator count to normalize by.
pub fn accelerator_divisor(system: &System) -> f64 {
    match system.num_accelerators {
        Some(count) if count > 0 => f64::from(count),
        _ => ACCELERATOR_DIVISOR_FALLBACK,
    }
}

/// Value a system is ranked and displayed by.
pub fn metric_value(system: &System, benchmark: &str, sort: SortKey) -> Option<f64> {
    let value = system.result(benchmark, sort.scenario)?;
    Some(if sort.normalize {
        value / accelerator_divisor(system)
    } else {
        value
    })
}

/// Systems with at least one measured value for `benchmark`, in snapshot order.
pub fn systems_for_benchmark<'s>(systems: &'s [System], benchmark: &str) -> Vec<&'s System> {
    systems
        .iter()
        .filter(|system| system.has_results_for(benchmark))
        .collect()
}

/// A system at its position in a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedSystem<'s> {
    /// 1-based position in the full ranking
    pub rank: usize,
    pub system: &'s System,
    pub value: Option<f64>,
}

/// Rank systems by metric, highest first.
///
/// The sort is stable: ties, including every absent value, keep their input
/// order. Absent values rank last.
pub fn sort_by_metric<'s>(
    systems: Vec<&'s System>,
    benchmark: &str,
    sort: SortKey,
) -> Vec<RankedSystem<'s>> {
    let mut scored: Vec<(&'s System, Option<f64>)> = systems
        .into_iter()
        .map(|system| (system, metric_value(system, benchmark, sort)))
        .collect();

    scored.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (system, value))| RankedSystem {
            rank: index + 1,
            system,
            value,
        })
        .collect()
}

/// One window of a list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based, after clamping
    pub page_index: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: PageSize,
}

/// Window `items` into a page.
///
/// Index 0 clamps to 1 and an index past the last page clamps to the last
/// page. `PageSize::All` returns everything for any index.
pub fn paginate<T>(items: &[T], page_index: usize, page_size: PageSize) -> Page<'_, T> {
    let total_items = items.len();
    let (total_pages, window) = match page_size {
        PageSize::All => (1, None),
        PageSize::Count(rows) => {
            let rows = rows.get();
            (total_items.div_ceil(rows).max(1), Some(rows))
        }
    };
    let page_index = page_index.clamp(1, total_pages);

    let items = match window {
        None => items,
        Some(rows) => {
            let start = ((page_index - 1) * rows).min(total_items);
            let end = (start + rows).min(total_items);
            &items[start..end]
        }
    };

    Page {
        items,
        page_index,
        total_pages,
        total_items,
        page_size,
    }
}

/// Result of running a view against a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<'a> {
    /// `None` when the requested benchmark is not in the catalog
    pub benchmark: Option<&'a Benchmark>,
    /// Scenario actually ranked by
    pub scenario: Scenario,
    pub unit: Option<Unit>,
    pub normalized: bool,
    pub rows: Vec<RankedSystem<'a>>,
    pub page_index: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: PageSize,
}

impl QueryResult<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-only query access to one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> QueryEngine<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn systems_for_benchmark(&self, benchmark: &str) -> Vec<&'a System> {
        systems_for_benchmark(&self.snapshot.systems, benchmark)
    }

    /// Scenario to rank by: the requested one if the benchmark supports it,
    /// otherwise the benchmark's first supported scenario.
    pub fn effective_scenario(benchmark: Option<&Benchmark>, requested: Scenario) -> Scenario {
        match benchmark {
            Some(benchmark) if !benchmark.supports(requested) => {
                benchmark.primary_scenario().unwrap_or(requested)
            }
            _ => requested,
        }
    }

    /// Filter, rank and paginate for `view`.
    pub fn run(&self, view: &ViewState) -> QueryResult<'a> {
        let benchmark = self.snapshot.benchmark(&view.benchmark);
        let scenario = Self::effective_scenario(benchmark, view.sort.scenario);
        let sort = SortKey {
            scenario,
            normalize: view.sort.normalize,
        };

        let ranked = match benchmark {
            Some(benchmark) => {
                sort_by_metric(self.systems_for_benchmark(&benchmark.name), &benchmark.name, sort)
            }
            None => {
                debug!(benchmark = %view.benchmark, "Query for unknown benchmark");
                Vec::new()
            }
        };

        let page = paginate(&ranked, view.page_index, view.page_size);
        QueryResult {
            benchmark,
            scenario,
            unit: benchmark.map(|benchmark| benchmark.unit_for(scenario)),
            normalized: sort.normalize,
            rows: page.items.to_vec(),
            page_index: page.page_index,
            total_pages: page.total_pages,
            total_items: page.total_items,
            page_size: page.page_size,
        }
    }
}
