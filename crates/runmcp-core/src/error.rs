//! Per-file input errors.
//!
//! These never abort a scan: the orchestrator records them on the file result
//! and continues with the next file.

use std::io;
use std::path::PathBuf;

/// Errors produced while reading and decoding a single config file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// File exceeds the configured size cap.
    #[error("config file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    /// Underlying filesystem failure.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Document is not syntactically valid JSON/YAML.
    #[error("invalid {format} syntax: {message}")]
    Syntax {
        format: &'static str,
        message: String,
    },

    /// Two sibling keys collapse to the same lower-case spelling.
    ///
    /// `path` is the dotted location of the preferred variant, with `[i]`
    /// segments for array indices.
    #[error("case-insensitive key collision at '{path}': '{current}' and '{first}'")]
    KeyCollision {
        path: String,
        current: String,
        first: String,
    },

    /// Neither `.json` nor `.yaml`/`.yml`.
    #[error("unknown config file extension: {path}")]
    UnknownExtension { path: PathBuf },

    /// Document decoded but does not match the chosen schema.
    #[error("config does not match the {kind} schema: {message}")]
    Schema { kind: String, message: String },
}

impl ParseError {
    /// Whether this error came from a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
