//! Ingestion error types
//!
//! Fatal errors abort a run and name the stage that failed. Row- and
//! cell-level problems are not errors at this level: they are recovered and
//! collected in the [`IngestReport`](crate::ingest::IngestReport).

use crate::types::{Scenario, Unit};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Pipeline stage a fatal error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Config,
    Read,
    Decode,
    Tabulate,
    Header,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Read => write!(f, "read"),
            Self::Decode => write!(f, "decode"),
            Self::Tabulate => write!(f, "tabulate"),
            Self::Header => write!(f, "header"),
        }
    }
}

/// Errors that abort an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Raw export could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No candidate encoding decoded the input
    #[error("No candidate encoding could decode the input ({attempts})")]
    Decode { attempts: String },

    /// Decoded text could not be split into rows
    #[error("Table tokenization failed: {0}")]
    Tabulate(#[from] csv::Error),

    /// Fewer rows than the fixed header block needs
    #[error("Header block needs {expected} rows, found {found}")]
    MissingHeader { expected: usize, found: usize },

    /// A column every entity depends on is absent from the header
    #[error("Required column '{field}' not found in the header")]
    MissingColumn { field: String },

    /// One benchmark/scenario pair declared under two units
    #[error(
        "Benchmark '{benchmark}' {scenario} declared as {first} and as {second} (column {column})"
    )]
    HeaderInconsistency {
        benchmark: String,
        scenario: Scenario,
        first: Unit,
        second: Unit,
        column: usize,
    },
}

impl IngestError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(field: impl Into<String>) -> Self {
        Self::MissingColumn {
            field: field.into(),
        }
    }

    /// Stage the error aborted
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config { .. } => Stage::Config,
            Self::Read { .. } => Stage::Read,
            Self::Decode { .. } => Stage::Decode,
            Self::Tabulate(_) => Stage::Tabulate,
            Self::MissingHeader { .. }
            | Self::MissingColumn { .. }
            | Self::HeaderInconsistency { .. } => Stage::Header,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_INVALID",
            Self::Read { .. } => "READ_FAILED",
            Self::Decode { .. } => "DECODE_FAILED",
            Self::Tabulate(_) => "TABULATE_FAILED",
            Self::MissingHeader { .. } => "HEADER_TOO_SHORT",
            Self::MissingColumn { .. } => "HEADER_MISSING_COLUMN",
            Self::HeaderInconsistency { .. } => "HEADER_INCONSISTENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_attribution() {
        let err = IngestError::MissingHeader {
            expected: 5,
            found: 2,
        };
        assert_eq!(err.stage(), Stage::Header);
        assert_eq!(err.code(), "HEADER_TOO_SHORT");

        let err = IngestError::Decode {
            attempts: "utf-8: invalid".to_string(),
        };
        assert_eq!(err.stage(), Stage::Decode);
        assert_eq!(err.stage().to_string(), "decode");
    }

    #[test]
    fn test_header_inconsistency_message() {
        let err = IngestError::HeaderInconsistency {
            benchmark: "resnet".to_string(),
            scenario: Scenario::Server,
            first: Unit::QueriesPerSecond,
            second: Unit::SamplesPerSecond,
            column: 21,
        };
        let msg = err.to_string();
        assert!(msg.contains("resnet"));
        assert!(msg.contains("Queries/s"));
        assert!(msg.contains("Samples/s"));
        assert!(msg.contains("column 21"));
    }
}
