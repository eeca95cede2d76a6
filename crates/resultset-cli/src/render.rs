//! Plain-text rendering for terminal output

use resultset::{IngestReport, QueryResult, Snapshot};

const MAX_NAME_WIDTH: usize = 48;

/// One-paragraph summary of a freshly written artifact.
pub fn ingest_summary(snapshot: &Snapshot, path: &str) -> String {
    let mut out = format!(
        "Wrote {} systems across {} benchmarks to {}\n",
        snapshot.metadata.total_systems, snapshot.metadata.total_benchmarks, path
    );
    for benchmark in &snapshot.benchmarks {
        let scenarios: Vec<&str> = benchmark.scenarios.iter().map(|s| s.as_str()).collect();
        out.push_str(&format!(
            "  - {}: {} ({})\n",
            benchmark.name,
            scenarios.join(", "),
            benchmark.unit
        ));
    }
    out
}

/// Summary plus the recovered-problem report.
pub fn ingest_output(snapshot: &Snapshot, report: &IngestReport, path: &str) -> String {
    let mut out = ingest_summary(snapshot, path);
    out.push('\n');
    out.push_str(&report.format_report());
    out
}

/// A page of query results as an aligned table.
pub fn query_table(result: &QueryResult<'_>) -> String {
    let Some(benchmark) = result.benchmark else {
        return "No such benchmark\n".to_string();
    };

    let unit = result
        .unit
        .map(|unit| unit.to_string())
        .unwrap_or_default();
    let value_header = if result.normalized {
        format!("{unit} per accelerator")
    } else {
        unit
    };

    let mut out = format!(
        "{} / {} (page {} of {}, {} systems)\n\n",
        benchmark.name, result.scenario, result.page_index, result.total_pages, result.total_items
    );
    out.push_str(&format!(
        "{:>4}  {:<10}  {:<20}  {:<width$}  {:>5}  {:>16}\n",
        "#",
        "Public ID",
        "Organization",
        "System",
        "Accel",
        value_header,
        width = MAX_NAME_WIDTH
    ));

    for row in &result.rows {
        let system = row.system;
        let accelerators = system
            .num_accelerators
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let value = row
            .value
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>4}  {:<10}  {:<20}  {:<width$}  {:>5}  {:>16}\n",
            row.rank,
            system.public_id,
            truncate(&system.organization, 20),
            truncate(&system.system_name, MAX_NAME_WIDTH),
            accelerators,
            value,
            width = MAX_NAME_WIDTH
        ));
    }
    out
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
