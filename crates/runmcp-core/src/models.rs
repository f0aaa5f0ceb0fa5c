//! Scan result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use runmcp_api::SecurityRating;

use crate::collector::LocalPolicy;
use crate::secrets::SecretFinding;

/// A per-file error, serialized as plain strings for JSON friendliness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanError {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cause: String,
}

impl ScanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: String::new(),
        }
    }
}

/// One named server declaration (redacted) as found in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The raw (redacted) sub-document of the declaration.
    pub server: Value,
}

/// Scan output for a single config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ScanError>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_findings: Vec<SecretFinding>,
}

impl FileResult {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Results for an entire scan across all targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub targets: Vec<String>,

    #[serde(default)]
    pub files: Vec<FileResult>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_findings: Vec<SecretFinding>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub duration_ms: u64,
}

impl ScanResult {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            targets,
            files: Vec::new(),
            servers: Vec::new(),
            secret_findings: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: 0,
        }
    }
}

/// A server with its rating, secrets, and local policy attached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerReport {
    pub name: String,

    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<SecurityRating>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretFinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_policy: Option<LocalPolicy>,
}
