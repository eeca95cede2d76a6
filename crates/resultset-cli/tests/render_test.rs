//! Terminal output over a real ingestion run

use resultset::{ingest_bytes, IngestConfig, PageSize, Scenario, SortKey, ViewState};
use resultset_cli::render;

fn export() -> String {
    let mut lines = vec![
        "MLPerf Inference v5.1".to_string(),
        String::new(),
        "\t\t\t\t\tllama2-70b-99\tllama2-70b-99".to_string(),
        "\t\t\t\t\tOffline\tServer".to_string(),
        "Public ID\tOrganization\tSystem Name\t# of Accelerators\tMeasure Names\tTokens/s\tTokens/s"
            .to_string(),
    ];
    let systems = [
        ("5.1-0001", "AMD", "MI300X x8", "8", "27,803.90"),
        ("5.1-0002", "NVIDIA", "DGX H100 with an exceptionally long marketing name attached", "8", "31,000.50"),
        ("5.1-0003", "Intel", "Xeon 6980P", "", "4,000"),
    ];
    for (id, org, name, accelerators, value) in systems {
        lines.push(format!("{id}\t{org}\t{name}\t\t# of Processors\t\t"));
        lines.push(format!("{id}\t{org}\t{name}\t{accelerators}\t# of Accelerators\t\t"));
        lines.push(format!("{id}\t{org}\t{name}\t\t# of Nodes\t\t"));
        lines.push(format!("{id}\t{org}\t{name}\t\tAvg. Result at System Name\t{value}\t"));
    }
    lines.join("\n")
}

#[test]
fn test_query_table_lists_ranked_rows() {
    let snapshot = ingest_bytes(export().as_bytes(), &IngestConfig::default())
        .unwrap()
        .snapshot;
    let result = snapshot.query().run(&ViewState::default());

    let table = render::query_table(&result);
    let lines: Vec<&str> = table.lines().collect();
    assert!(lines[0].starts_with("llama2-70b-99 / Offline (page 1 of 1, 3 systems)"));
    assert!(lines[2].contains("Tokens/s"));
    assert!(lines[3].contains("5.1-0002"));
    assert!(lines[3].contains("31000.50"));
    assert!(lines[3].contains('…'));
    assert!(lines[5].contains("5.1-0003"));
    assert!(lines[5].contains("4000.00"));
}

#[test]
fn test_query_table_per_accelerator_header() {
    let snapshot = ingest_bytes(export().as_bytes(), &IngestConfig::default())
        .unwrap()
        .snapshot;
    let view = ViewState::default()
        .with_sort(SortKey {
            scenario: Scenario::Offline,
            normalize: true,
        })
        .with_page_size(PageSize::count(1).unwrap(), 3);
    let result = snapshot.query().run(&view);

    let table = render::query_table(&result);
    assert!(table.contains("Tokens/s per accelerator"));
    assert!(table.contains("page 1 of 3"));
    // 4000 with no accelerator count beats 31000.5 / 8
    assert!(table.contains("5.1-0003"));
}

#[test]
fn test_unknown_benchmark_table() {
    let snapshot = ingest_bytes(export().as_bytes(), &IngestConfig::default())
        .unwrap()
        .snapshot;
    let result = snapshot.query().run(&ViewState::new("nope"));
    assert_eq!(render::query_table(&result), "No such benchmark\n");
}

#[test]
fn test_ingest_output_includes_report() {
    let ingestion = ingest_bytes(export().as_bytes(), &IngestConfig::default()).unwrap();
    let out = render::ingest_output(&ingestion.snapshot, &ingestion.report, "data.json");
    assert!(out.starts_with("Wrote 3 systems across 1 benchmarks to data.json"));
    assert!(out.contains("  - llama2-70b-99: Offline (Tokens/s)"));
    assert!(out.contains("# Ingestion Report"));
}
