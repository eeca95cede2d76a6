//! View state
//!
//! An immutable description of what the consumer is looking at. Every change
//! produces a new value, and the engine recomputes from scratch for it.

use crate::types::Scenario;
use serde::{Serialize, Serializer};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Benchmark shown when the consumer has not picked one.
pub const DEFAULT_BENCHMARK: &str = "llama2-70b-99";

/// Rows per page when the consumer has not picked a size.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// What to rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub scenario: Scenario,
    /// Divide by the accelerator count before ranking
    pub normalize: bool,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            scenario: Scenario::Offline,
            normalize: false,
        }
    }
}

/// Page size: a fixed row count, or everything on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    All,
    Count(NonZeroUsize),
}

impl PageSize {
    /// Fixed page size; `None` for zero.
    pub fn count(rows: usize) -> Option<Self> {
        NonZeroUsize::new(rows).map(Self::Count)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::count(DEFAULT_PAGE_SIZE).unwrap_or(Self::All)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Count(rows) => write!(f, "{rows}"),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let rows: usize = trimmed
            .parse()
            .map_err(|_| format!("page size must be a positive number or 'all', got '{trimmed}'"))?;
        Self::count(rows).ok_or_else(|| "page size must be greater than zero".to_string())
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Count(rows) => serializer.serialize_u64(rows.get() as u64),
        }
    }
}

/// Benchmark, sort mode and page window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub benchmark: String,
    pub sort: SortKey,
    /// 1-based; clamped into range at query time
    pub page_index: usize,
    pub page_size: PageSize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_BENCHMARK)
    }
}

impl ViewState {
    pub fn new(benchmark: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
            sort: SortKey::default(),
            page_index: 1,
            page_size: PageSize::default(),
        }
    }

    /// Switch benchmark; always back to page 1.
    pub fn with_benchmark(self, benchmark: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
            page_index: 1,
            ..self
        }
    }

    /// Change the sort; the page index is kept.
    pub fn with_sort(self, sort: SortKey) -> Self {
        Self { sort, ..self }
    }

    pub fn with_page(self, page_index: usize) -> Self {
        Self { page_index, ..self }
    }

    /// Change the page size.
    ///
    /// The page index survives unless its first row would fall past
    /// `total_items`; `All` always returns to page 1.
    pub fn with_page_size(self, page_size: PageSize, total_items: usize) -> Self {
        let page_index = match page_size {
            PageSize::All => 1,
            PageSize::Count(rows) => {
                let offset = self.page_index.saturating_sub(1).saturating_mul(rows.get());
                if offset >= total_items {
                    1
                } else {
                    self.page_index
                }
            }
        };
        Self {
            page_size,
            page_index,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let view = ViewState::default();
        assert_eq!(view.benchmark, DEFAULT_BENCHMARK);
        assert_eq!(view.sort.scenario, Scenario::Offline);
        assert!(!view.sort.normalize);
        assert_eq!(view.page_index, 1);
        assert_eq!(view.page_size, PageSize::count(20).unwrap());
    }

    #[test]
    fn test_transitions() {
        let view = ViewState::default().with_page(3);

        let sorted = view.clone().with_sort(SortKey {
            scenario: Scenario::Server,
            normalize: true,
        });
        assert_eq!(sorted.page_index, 3);
        assert!(sorted.sort.normalize);

        let switched = sorted.with_benchmark("bert-99");
        assert_eq!(switched.page_index, 1);
        assert_eq!(switched.sort.scenario, Scenario::Server);

        // page 3 of size 10 starts at row 20: still inside 25 rows
        let resized = view.clone().with_page_size(PageSize::count(10).unwrap(), 25);
        assert_eq!(resized.page_index, 3);

        // page 3 of size 20 would start at row 40: past the end
        let resized = view.clone().with_page_size(PageSize::count(20).unwrap(), 25);
        assert_eq!(resized.page_index, 1);

        let everything = view.with_page_size(PageSize::All, 25);
        assert_eq!(everything.page_index, 1);
        assert_eq!(everything.page_size, PageSize::All);
    }

    #[test]
    fn test_page_size_parsing() {
        assert_eq!("all".parse::<PageSize>().unwrap(), PageSize::All);
        assert_eq!(" ALL ".parse::<PageSize>().unwrap(), PageSize::All);
        assert_eq!("50".parse::<PageSize>().unwrap(), PageSize::count(50).unwrap());
        assert!("0".parse::<PageSize>().is_err());
        assert!("many".parse::<PageSize>().is_err());
        assert_eq!(PageSize::All.to_string(), "all");
        assert_eq!(serde_json::to_value(PageSize::count(20).unwrap()).unwrap(), 20);
        assert_eq!(serde_json::to_value(PageSize::All).unwrap(), "all");
    }
}
