//! Query and view layer
//!
//! Filter → sort → paginate over an immutable [`Snapshot`](crate::Snapshot),
//! driven by a [`ViewState`] value.

pub mod engine;
pub mod view;

pub use engine::{
    accelerator_divisor, metric_value, paginate, sort_by_metric, systems_for_benchmark, Page,
    QueryEngine, QueryResult, RankedSystem, ACCELERATOR_DIVISOR_FALLBACK,
};
pub use view::{PageSize, SortKey, ViewState, DEFAULT_BENCHMARK, DEFAULT_PAGE_SIZE};
