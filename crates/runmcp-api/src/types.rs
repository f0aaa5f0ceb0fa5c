//! Wire types for the ratings API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind discriminator for a target identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Package URL (`pkg:npm/...`, `pkg:pypi/...`).
    Purl,
    /// OCI image reference (`registry/repo:tag`).
    Oci,
    /// Source repository (`org/repo`).
    Repo,
    /// Canonical server URL.
    Url,
}

impl IdentifierKind {
    /// Path segment used by the single-rating endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purl => "purl",
            Self::Oci => "oci",
            Self::Repo => "repo",
            Self::Url => "url",
        }
    }
}

/// A canonical identifier for a declared MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetIdentifier {
    /// Identifier kind.
    pub kind: IdentifierKind,

    /// Canonical string form.
    pub value: String,
}

/// Request body for `POST /ratings/batch`. At most 50 identifiers per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRatingRequest {
    /// Identifiers to rate, order preserved.
    pub identifiers: Vec<TargetIdentifier>,
}

/// One entry of an immediate batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRatingItem {
    /// The identifier this entry answers.
    pub identifier: TargetIdentifier,

    /// Relative path of the rating resource under the API base.
    pub rating_url: String,
}

/// 200 response of `POST /ratings/batch`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRatingResponse {
    /// Rating links, one per known identifier.
    #[serde(default)]
    pub ratings: Vec<BatchRatingItem>,
}

/// Overall state of an asynchronous scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanState {
    Queued,
    Running,
    Partial,
    Completed,
    Failed,
    Canceled,
}

/// Per-target state within an asynchronous scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanTargetStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// One target of an asynchronous scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The identifier being scanned.
    pub identifier: TargetIdentifier,

    /// Target state.
    pub status: ScanTargetStatus,

    /// Rating resource path, present once the target completed.
    #[serde(default)]
    pub rating_url: Option<String>,
}

/// 202 response of `POST /ratings/batch` and 200 response of
/// `GET /scan-status/{uuid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatus {
    /// Scan identifier for polling.
    pub scan_id: Uuid,

    /// Overall state.
    pub status: ScanState,

    /// Per-target progress.
    #[serde(default)]
    pub targets: Vec<ScanTarget>,

    /// Failure detail when `status` is `FAILED`.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// 202 response of the single-rating endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInProgress {
    /// Scan identifier for polling.
    pub scan_id: Uuid,

    /// Relative polling path, e.g. `/scan-status/{uuid}`.
    #[serde(default)]
    pub poll_url: Option<String>,
}

/// A security assessment for one rated entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRating {
    /// Content hash of the rated entity.
    pub hash: String,

    /// Display name.
    pub name: String,

    /// Rated version.
    #[serde(default)]
    pub version: String,

    /// Category label (TRUSTED, SUSPICIOUS, UNTRUSTED, MALICIOUS).
    pub category: String,

    /// Risk score in [0.0, 10.0].
    pub risk_score: f64,

    /// Known vulnerability identifiers.
    #[serde(default)]
    pub vulnerabilities: Vec<String>,

    /// When the rating was last refreshed.
    pub last_updated: DateTime<Utc>,

    /// Rating provenance ("api", "heuristic", "manual").
    #[serde(default)]
    pub source: String,
}

/// 200 response of the single-rating endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingResponse {
    /// Ratings for the requested identifier, newest first.
    #[serde(default)]
    pub ratings: Vec<SecurityRating>,
}

/// Health probe status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Reported status.
    pub status: HealthStatus,
}

/// Error body returned by the control plane on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    #[serde(default)]
    pub error: String,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Correlation id for support.
    #[serde(default)]
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_kind_serializes_lowercase() {
        let id = TargetIdentifier {
            kind: IdentifierKind::Purl,
            value: "pkg:npm/test".into(),
        };
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"kind":"purl","value":"pkg:npm/test"}"#);
    }

    #[test]
    fn scan_status_roundtrips() {
        let raw = r#"{
            "scan_id": "4f9f24bb-9c5a-4a6e-a29c-1f2b7b9e1a11",
            "status": "COMPLETED",
            "targets": [
                {
                    "identifier": {"kind": "repo", "value": "ensignia/run-mcp"},
                    "status": "COMPLETED",
                    "rating_url": "/ratings/repo/ensignia/run-mcp"
                }
            ]
        }"#;
        let st: ScanStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(st.status, ScanState::Completed);
        assert_eq!(st.targets.len(), 1);
        assert_eq!(st.targets[0].status, ScanTargetStatus::Completed);
        assert!(st.error_message.is_none());

        let back = serde_json::to_value(&st).unwrap();
        assert_eq!(back["status"], "COMPLETED");
        assert_eq!(back["targets"][0]["identifier"]["kind"], "repo");
    }
}
