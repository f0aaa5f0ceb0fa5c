//! Transport error taxonomy.

use std::time::Duration;

/// Errors surfaced by the ratings client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Publishable key rejected (401).
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// No rating known for the identifier (404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Request rejected by validation (400).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Rate limit exceeded (429), with the server's `Retry-After` if present.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other remote failure, with status code and optional request id.
    #[error("remote error {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// The health probe failed; the process runs offline for this run.
    #[error("offline")]
    Offline,

    /// Connection-level failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body did not match the wire contract.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Scan reference was neither a UUID nor a `/scan-status/{uuid}` path.
    #[error("invalid scan reference: {reference}")]
    InvalidScanRef { reference: String },

    /// Asynchronous scan reported FAILED.
    #[error("scan failed: {message}")]
    ScanFailed { message: String },

    /// Asynchronous scan reported CANCELED.
    #[error("scan canceled")]
    ScanCanceled,
}

impl ApiError {
    /// Whether a caller may retry the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network { .. } | Self::Remote { status: 500.., .. }
        )
    }

    /// `Retry-After` hint when rate limited.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_covers_rate_limit_and_5xx() {
        assert!(ApiError::RateLimited { retry_after: None }.is_retryable());
        assert!(ApiError::Remote {
            status: 503,
            message: "unavailable".into(),
            request_id: None,
        }
        .is_retryable());
        assert!(!ApiError::Remote {
            status: 404,
            message: "missing".into(),
            request_id: None,
        }
        .is_retryable());
        assert!(!ApiError::Unauthorized {
            message: "bad key".into()
        }
        .is_retryable());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        let e = ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(e.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(ApiError::Offline.retry_after(), None);
    }
}
