//! Ingestion configuration
//!
//! Layered lowest to highest: [`IngestConfig::default`], an optional TOML
//! file, then `RESULTSET_*` environment variables. The CLI applies its flags
//! on top of the result.

use crate::error::{IngestError, IngestResult};
use crate::ingest::encoding::Encoding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Artifact version written when nothing overrides it.
pub const DEFAULT_VERSION: &str = "5.1";

/// Artifact description written when nothing overrides it.
pub const DEFAULT_DESCRIPTION: &str = "MLPerf Inference Datacenter benchmark results";

/// Settings for one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Field delimiter; must be a single ASCII character
    #[serde(deserialize_with = "deserialize_delimiter")]
    pub delimiter: char,

    /// Encodings to try, in order
    pub encodings: Vec<Encoding>,

    /// Let blank benchmark/scenario header cells inherit the value to their left
    pub fill_merged_headers: bool,

    /// Drop systems that carry no measured value at all
    pub require_results: bool,

    /// Artifact `metadata.version`
    pub version: String,

    /// Artifact `metadata.description`
    pub description: String,

    /// Fixed generation time; `None` uses the wall clock
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: '\t',
            encodings: Encoding::DEFAULT_CANDIDATES.to_vec(),
            fill_merged_headers: false,
            require_results: true,
            version: DEFAULT_VERSION.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            generated_at: None,
        }
    }
}

impl IngestConfig {
    /// Load from a TOML file; absent keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| IngestError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> IngestResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay the process environment.
    pub fn apply_env(&mut self) -> IngestResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup`.
    ///
    /// Recognized: `RESULTSET_DELIMITER`, `RESULTSET_ENCODINGS` (comma list),
    /// `RESULTSET_VERSION`, `RESULTSET_DESCRIPTION`,
    /// `RESULTSET_FILL_MERGED_HEADERS`, `RESULTSET_REQUIRE_RESULTS` and
    /// `SOURCE_DATE_EPOCH`.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> IngestResult<()> {
        if let Some(value) = lookup("RESULTSET_DELIMITER") {
            self.delimiter = parse_delimiter(&value)?;
        }
        if let Some(value) = lookup("RESULTSET_ENCODINGS") {
            self.encodings = parse_encodings(&value)?;
        }
        if let Some(value) = lookup("RESULTSET_VERSION") {
            self.version = value;
        }
        if let Some(value) = lookup("RESULTSET_DESCRIPTION") {
            self.description = value;
        }
        if let Some(value) = lookup("RESULTSET_FILL_MERGED_HEADERS") {
            self.fill_merged_headers = parse_flag(&value);
        }
        if let Some(value) = lookup("RESULTSET_REQUIRE_RESULTS") {
            self.require_results = parse_flag(&value);
        }
        if let Some(value) = lookup("SOURCE_DATE_EPOCH") {
            let secs: i64 = value.trim().parse().map_err(|_| {
                IngestError::config(format!("SOURCE_DATE_EPOCH is not an integer: '{value}'"))
            })?;
            self.generated_at = Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                IngestError::config(format!("SOURCE_DATE_EPOCH out of range: {secs}"))
            })?);
        }
        self.validate()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> IngestResult<()> {
        self.delimiter_byte().map(|_| ())
    }

    /// Delimiter as the byte the tokenizer splits on.
    pub fn delimiter_byte(&self) -> IngestResult<u8> {
        match self.delimiter {
            '"' | '\n' | '\r' => Err(IngestError::config(format!(
                "delimiter {:?} conflicts with quoting or line breaks",
                self.delimiter
            ))),
            c if c.is_ascii() => Ok(c as u8),
            c => Err(IngestError::config(format!(
                "delimiter {c:?} is not a single ASCII character"
            ))),
        }
    }

    /// Generation time to stamp into the artifact.
    pub fn generation_time(&self) -> DateTime<Utc> {
        self.generated_at.unwrap_or_else(Utc::now)
    }
}

/// Parse a delimiter: a single character, or `tab` / `\t`.
pub fn parse_delimiter(value: &str) -> IngestResult<char> {
    match value {
        "\t" | "\\t" => return Ok('\t'),
        v if v.eq_ignore_ascii_case("tab") => return Ok('\t'),
        _ => {}
    }
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(IngestError::config(format!(
            "delimiter must be one character, got '{value}'"
        ))),
    }
}

fn deserialize_delimiter<'de, D>(deserializer: D) -> Result<char, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_delimiter(&value).map_err(serde::de::Error::custom)
}

/// Parse a comma-separated encoding list.
pub fn parse_encodings(value: &str) -> IngestResult<Vec<Encoding>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| label.parse::<Encoding>().map_err(IngestError::config))
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.encodings, Encoding::DEFAULT_CANDIDATES.to_vec());
        assert!(!config.fill_merged_headers);
        assert!(config.require_results);
        assert_eq!(config.version, "5.1");
        assert_eq!(config.delimiter_byte().unwrap(), b'\t');
    }

    #[test]
    fn test_env_overlay() {
        let mut config = IngestConfig::default();
        config
            .apply_vars(vars(&[
                ("RESULTSET_DELIMITER", ","),
                ("RESULTSET_ENCODINGS", "utf-8, latin1"),
                ("RESULTSET_VERSION", "5.0"),
                ("RESULTSET_FILL_MERGED_HEADERS", "true"),
                ("RESULTSET_REQUIRE_RESULTS", "0"),
                ("SOURCE_DATE_EPOCH", "1700000000"),
            ]))
            .unwrap();

        assert_eq!(config.delimiter, ',');
        assert_eq!(config.encodings, vec![Encoding::Utf8, Encoding::Latin1]);
        assert_eq!(config.version, "5.0");
        assert!(config.fill_merged_headers);
        assert!(!config.require_results);
        assert_eq!(
            config.generated_at.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_bad_env_values_are_config_errors() {
        let mut config = IngestConfig::default();
        let err = config
            .apply_vars(vars(&[("RESULTSET_ENCODINGS", "utf-8,ebcdic")]))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");

        let err = config
            .apply_vars(vars(&[("SOURCE_DATE_EPOCH", "yesterday")]))
            .unwrap_err();
        assert!(err.to_string().contains("SOURCE_DATE_EPOCH"));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("tab").unwrap(), '\t');
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert_eq!(parse_delimiter("\t").unwrap(), '\t');
        assert_eq!(parse_delimiter(";").unwrap(), ';');
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = IngestConfig {
            delimiter: '§',
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IngestConfig {
            delimiter: '"',
            ..IngestConfig::default()
        };
        assert!(config.delimiter_byte().is_err());
    }

    #[test]
    fn test_toml_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultset.toml");
        std::fs::write(
            &path,
            "delimiter = \",\"\nencodings = [\"utf-8\"]\ngenerated_at = \"2025-09-01T12:00:00Z\"\n",
        )
        .unwrap();

        let config = IngestConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.encodings, vec![Encoding::Utf8]);
        assert!(config.require_results);
        assert_eq!(config.version, DEFAULT_VERSION);
        assert!(config.generated_at.is_some());
    }

    #[test]
    fn test_toml_file_accepts_env_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultset.toml");
        std::fs::write(&path, "delimiter = \"tab\"\nencodings = [\"utf8\", \"latin1\"]\n").unwrap();

        let config = IngestConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.encodings, vec![Encoding::Utf8, Encoding::Latin1]);

        std::fs::write(&path, "delimiter = \"::\"\n").unwrap();
        let err = IngestConfig::from_toml_file(&path).unwrap_err();
        assert!(err.to_string().contains("delimiter"));
    }

    #[test]
    fn test_toml_file_errors() {
        let err = IngestConfig::from_toml_file("/nonexistent/resultset.toml").unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "require_results = \"maybe\"\n").unwrap();
        let err = IngestConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, IngestError::Config { .. }));
    }
}
