//! Encoding resolution
//!
//! Tries each candidate encoding in order and keeps the first that decodes
//! the raw export cleanly.

use crate::error::{IngestError, IngestResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Text encodings the resolver can try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Encoding {
    /// UTF-16 with a byte-order mark
    #[serde(rename = "utf-16", alias = "utf16", alias = "UTF-16")]
    Utf16,
    /// UTF-16 little endian, no BOM
    #[serde(rename = "utf-16le", alias = "utf-16-le", alias = "utf16le")]
    Utf16Le,
    /// UTF-16 big endian, no BOM
    #[serde(rename = "utf-16be", alias = "utf-16-be", alias = "utf16be")]
    Utf16Be,
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    /// ISO-8859-1; every byte sequence decodes
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    /// Default candidate order.
    pub const DEFAULT_CANDIDATES: [Encoding; 5] = [
        Encoding::Utf16,
        Encoding::Utf8,
        Encoding::Utf16Le,
        Encoding::Utf16Be,
        Encoding::Latin1,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Utf16 => "utf-16",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }

    /// Decode `bytes`, or explain why this encoding does not fit.
    fn decode(self, bytes: &[u8]) -> Result<String, DecodeFailure> {
        let text = match self {
            Self::Utf16 => {
                if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
                    decode_utf16(rest, true)?
                } else if let Some(rest) = bytes.strip_prefix(UTF16BE_BOM) {
                    decode_utf16(rest, false)?
                } else {
                    return Err(DecodeFailure::MissingBom);
                }
            }
            Self::Utf16Le | Self::Utf16Be => {
                let text = decode_utf16(bytes, self == Self::Utf16Le)?;
                if !text.contains('\n') && !text.contains('\r') {
                    return Err(DecodeFailure::NoLineBreak);
                }
                text
            }
            Self::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body)
                    .map_err(|e| DecodeFailure::InvalidUtf8 {
                        offset: e.valid_up_to(),
                    })?
                    .to_string()
            }
            Self::Latin1 => return Ok(bytes.iter().map(|&b| b as char).collect()),
        };

        if text.contains('\0') {
            return Err(DecodeFailure::ContainsNul);
        }
        Ok(text)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-16" | "utf16" => Ok(Self::Utf16),
            "utf-16le" | "utf-16-le" | "utf16le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf-16-be" | "utf16be" => Ok(Self::Utf16Be),
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(format!("unsupported encoding '{other}'")),
        }
    }
}

#[derive(Debug)]
enum DecodeFailure {
    MissingBom,
    OddLength,
    UnpairedSurrogate,
    InvalidUtf8 { offset: usize },
    ContainsNul,
    NoLineBreak,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBom => write!(f, "no byte-order mark"),
            Self::OddLength => write!(f, "odd byte length"),
            Self::UnpairedSurrogate => write!(f, "unpaired surrogate"),
            Self::InvalidUtf8 { offset } => write!(f, "invalid byte at offset {offset}"),
            Self::ContainsNul => write!(f, "decoded text contains NUL"),
            Self::NoLineBreak => write!(f, "no line break in decoded text"),
        }
    }
}

fn decode_utf16(bytes: &[u8], le: bool) -> Result<String, DecodeFailure> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeFailure::OddLength);
    }
    let units = bytes.chunks_exact(2).map(|pair| {
        if le {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });
    std::char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| DecodeFailure::UnpairedSurrogate)
}

/// Decoded export text and the encoding that produced it.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: Encoding,
}

/// Decode `bytes` with the first candidate that succeeds.
pub fn resolve(bytes: &[u8], candidates: &[Encoding]) -> IngestResult<Decoded> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for &encoding in candidates {
        match encoding.decode(bytes) {
            Ok(text) => {
                info!(encoding = %encoding, bytes = bytes.len(), "Decoded export");
                return Ok(Decoded { text, encoding });
            }
            Err(failure) => {
                debug!(encoding = %encoding, reason = %failure, "Encoding rejected");
                attempts.push(format!("{encoding}: {failure}"));
            }
        }
    }

    if attempts.is_empty() {
        attempts.push("no candidate encodings configured".to_string());
    }
    Err(IngestError::Decode {
        attempts: attempts.join("; "),
    })
}
