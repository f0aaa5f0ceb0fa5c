//! HTTP client for the run-mcp ratings control plane.
//!
//! The client is health-gated: construction performs a one-shot probe of
//! `/health` with a short timeout, and a failed probe switches the process
//! into offline mode for the remainder of the run. All endpoints speak JSON
//! and authenticate with a bearer publishable key; when the caller is not
//! anonymous, org and host UUIDs are attached as request headers.
//!
//! # Quick start
//!
//! ```no_run
//! use runmcp_api::{ApiClient, BatchRatingRequest, IdentifierKind, TargetIdentifier};
//!
//! # async fn example() -> Result<(), runmcp_api::ApiError> {
//! let client = ApiClient::builder().connect().await?;
//! let outcome = client
//!     .submit_batch_ratings(&BatchRatingRequest {
//!         identifiers: vec![TargetIdentifier {
//!             kind: IdentifierKind::Purl,
//!             value: "pkg:npm/@upstash/context7-mcp".into(),
//!         }],
//!     })
//!     .await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod identity;
pub mod ratings;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult};
pub use identity::{scoped_identity, with_identity, Identity};
pub use ratings::{BatchOutcome, RatingResult, RatingTarget, RatingsClient};
pub use types::{
    BatchRatingItem, BatchRatingRequest, BatchRatingResponse, ErrorBody, HealthResponse,
    HealthStatus, IdentifierKind, RatingResponse, ScanInProgress, ScanState, ScanStatus,
    ScanTarget, ScanTargetStatus, SecurityRating, TargetIdentifier,
};
