//! Benchmark result-set CLI
//!
//! Ingests an MLPerf-Inference style crosstab export into a JSON artifact,
//! queries the artifact, and validates it.
//!
//! # Usage
//!
//! ```bash
//! # Ingest a UTF-16 tab-delimited export
//! resultset ingest inference51results.csv -o data.json
//!
//! # Top systems for a benchmark, per accelerator
//! resultset query data.json --benchmark llama2-70b-99 --per-accelerator
//!
//! # Check an artifact before publishing it
//! resultset validate data.json
//!
//! # Reproducible artifacts
//! SOURCE_DATE_EPOCH=1756800000 resultset ingest inference51results.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use resultset::query::DEFAULT_BENCHMARK;
use resultset::{
    ingest_file, validate_json, Encoding, IngestConfig, IngestError, PageSize, Scenario, Snapshot,
    SortKey, ViewState,
};
use resultset_cli::{render, resolve_ingest_config, IngestOverrides};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a raw export and write the JSON artifact
    Ingest {
        /// Raw export file
        input: PathBuf,

        /// Artifact path
        #[arg(short, long, default_value = "data.json")]
        output: PathBuf,

        /// TOML config file (overridden by RESULTSET_* variables and flags)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Field delimiter: one character, or `tab`
        #[arg(long)]
        delimiter: Option<String>,

        /// Encoding to try; repeat to set the order
        #[arg(long = "encoding")]
        encodings: Vec<Encoding>,

        /// Let blank benchmark/scenario header cells inherit from the left
        #[arg(long, default_value_t = false)]
        fill_merged_headers: bool,

        /// Keep systems that have no measured value
        #[arg(long, default_value_t = false)]
        keep_empty: bool,

        /// Artifact version (overrides RESULTSET_VERSION)
        #[arg(long)]
        version_label: Option<String>,
    },

    /// Print one page of a ranking from an artifact
    Query {
        artifact: PathBuf,

        #[arg(long, default_value = DEFAULT_BENCHMARK)]
        benchmark: String,

        /// Scenario to rank by; falls back to the benchmark's first scenario
        #[arg(long, default_value = "Offline")]
        scenario: Scenario,

        /// Rank by value per accelerator
        #[arg(long, default_value_t = false)]
        per_accelerator: bool,

        /// 1-based page index
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page, or `all`
        #[arg(long, default_value = "20")]
        page_size: PageSize,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check an artifact's structure and invariants
    Validate {
        artifact: PathBuf,

        #[arg(long, default_value = DEFAULT_BENCHMARK)]
        default_benchmark: String,
    },

    /// Print the artifact JSON Schema
    Schema,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Ingest {
            input,
            output,
            config,
            delimiter,
            encodings,
            fill_merged_headers,
            keep_empty,
            version_label,
        } => {
            let overrides = IngestOverrides {
                delimiter,
                encodings,
                fill_merged_headers,
                keep_systems_without_results: keep_empty,
                version: version_label,
                description: None,
            };
            let config = resolve_ingest_config(config.as_deref(), &overrides)?;
            run_ingest(&input, &output, &config)
        }
        Command::Query {
            artifact,
            benchmark,
            scenario,
            per_accelerator,
            page,
            page_size,
            json,
        } => {
            let view = ViewState {
                benchmark,
                sort: SortKey {
                    scenario,
                    normalize: per_accelerator,
                },
                page_index: page,
                page_size,
            };
            run_query(&artifact, &view, json)
        }
        Command::Validate {
            artifact,
            default_benchmark,
        } => run_validate(&artifact, &default_benchmark),
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&Snapshot::json_schema())?;
            println!("{schema}");
            Ok(())
        }
    }
}

fn run_ingest(input: &Path, output: &Path, config: &IngestConfig) -> Result<()> {
    let ingestion = ingest_file(input, config).map_err(stage_error)?;
    ingestion
        .snapshot
        .save(output)
        .with_context(|| format!("Failed to write artifact to {}", output.display()))?;

    print!(
        "{}",
        render::ingest_output(
            &ingestion.snapshot,
            &ingestion.report,
            &output.display().to_string()
        )
    );
    Ok(())
}

fn run_query(artifact: &Path, view: &ViewState, json: bool) -> Result<()> {
    let snapshot = Snapshot::load(artifact)
        .with_context(|| format!("Failed to load artifact {}", artifact.display()))?;
    let result = snapshot.query().run(view);
    info!(
        benchmark = %view.benchmark,
        scenario = %result.scenario,
        rows = result.rows.len(),
        "Query complete"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render::query_table(&result));
    }
    Ok(())
}

fn run_validate(artifact: &Path, default_benchmark: &str) -> Result<()> {
    let content = std::fs::read_to_string(artifact)
        .with_context(|| format!("Failed to read artifact {}", artifact.display()))?;
    let report = validate_json(&content, default_benchmark);
    print!("{}", report.format_report());

    if !report.is_valid() {
        bail!(
            "{} failed validation with {} error(s)",
            artifact.display(),
            report.errors().count()
        );
    }
    Ok(())
}

/// Fatal ingestion errors name the stage that failed.
fn stage_error(err: IngestError) -> anyhow::Error {
    let stage = err.stage();
    let code = err.code();
    anyhow::Error::new(err).context(format!("Ingestion failed at {stage} stage [{code}]"))
}
