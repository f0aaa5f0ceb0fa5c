//! Ratings endpoints: single lookups, batch submission, and scan polling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::debug;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    BatchRatingRequest, BatchRatingResponse, RatingResponse, ScanInProgress, ScanState, ScanStatus,
    ScanTargetStatus, SecurityRating, TargetIdentifier,
};

/// Target of a single-rating lookup.
#[derive(Debug, Clone)]
pub enum RatingTarget {
    /// `GET /ratings/purl/{purl}`.
    Purl(String),
    /// `GET /ratings/repo/{org}/{repo}`.
    Repo { org: String, repo: String },
    /// `GET /ratings/oci/{ref}`.
    Oci(String),
    /// `GET /ratings/url/{url}`.
    Url(String),
}

/// 200 vs 202 outcome of a single-rating lookup.
#[derive(Debug, Clone, Default)]
pub struct RatingResult {
    /// Present on an immediate 200 response.
    pub rating: Option<SecurityRating>,

    /// Present on a 202 scan-in-progress response.
    pub in_progress: Option<ScanInProgress>,
}

/// 200 vs 202 outcome of a batch submission.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Immediate rating links.
    Ratings(BatchRatingResponse),
    /// Scan accepted; poll `scan_id` for completion.
    Accepted(ScanStatus),
}

/// Transport seam used by the ratings collector. Implemented by [`ApiClient`]
/// and by test doubles.
#[async_trait]
pub trait RatingsClient: Send + Sync {
    /// Look up the rating for one identifier.
    async fn get_rating(&self, target: &RatingTarget) -> ApiResult<RatingResult>;

    /// Submit a batch of identifiers.
    async fn submit_batch_ratings(&self, request: &BatchRatingRequest) -> ApiResult<BatchOutcome>;

    /// Fetch the status of an asynchronous scan.
    async fn get_scan_status(&self, scan_id: Uuid) -> ApiResult<ScanStatus>;

    /// Poll a scan to completion and return the ratings of every completed
    /// target, paired with the identifier each one answers.
    ///
    /// `scan_ref` is either a raw UUID or a `/scan-status/{uuid}` path.
    async fn wait_for_scan_completion(
        &self,
        scan_ref: &str,
        poll_every: Duration,
    ) -> ApiResult<Vec<(TargetIdentifier, SecurityRating)>>;
}

#[async_trait]
impl RatingsClient for ApiClient {
    async fn get_rating(&self, target: &RatingTarget) -> ApiResult<RatingResult> {
        let url = match target {
            RatingTarget::Purl(purl) => {
                let mut segments = vec!["ratings", "purl"];
                segments.extend(purl.split('/'));
                self.endpoint_segments(&segments)?
            }
            RatingTarget::Repo { org, repo } => {
                self.endpoint_segments(&["ratings", "repo", org.as_str(), repo.as_str()])?
            }
            RatingTarget::Oci(reference) => {
                self.endpoint_segments(&["ratings", "oci", reference.as_str()])?
            }
            RatingTarget::Url(raw) => self.endpoint_segments(&["ratings", "url", raw.as_str()])?,
        };
        debug!(url = %url, "fetching rating");

        let response = self.request(Method::GET, &url)?.send().await?;
        match response.status() {
            StatusCode::OK => {
                let body: RatingResponse =
                    response.json().await.map_err(|e| ApiError::InvalidResponse {
                        message: format!("rating response: {e}"),
                    })?;
                Ok(RatingResult {
                    rating: body.ratings.into_iter().next(),
                    in_progress: None,
                })
            }
            StatusCode::ACCEPTED => {
                let body: ScanInProgress =
                    response.json().await.map_err(|e| ApiError::InvalidResponse {
                        message: format!("scan-in-progress response: {e}"),
                    })?;
                Ok(RatingResult {
                    rating: None,
                    in_progress: Some(body),
                })
            }
            _ => Err(Self::handle_error_response(response).await),
        }
    }

    async fn submit_batch_ratings(&self, request: &BatchRatingRequest) -> ApiResult<BatchOutcome> {
        let url = self.endpoint("/ratings/batch");
        debug!(url = %url, identifiers = request.identifiers.len(), "submitting rating batch");

        let response = self
            .request(Method::POST, &url)?
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: BatchRatingResponse =
                    response.json().await.map_err(|e| ApiError::InvalidResponse {
                        message: format!("batch response: {e}"),
                    })?;
                Ok(BatchOutcome::Ratings(body))
            }
            StatusCode::ACCEPTED => {
                let body: ScanStatus =
                    response.json().await.map_err(|e| ApiError::InvalidResponse {
                        message: format!("scan status response: {e}"),
                    })?;
                Ok(BatchOutcome::Accepted(body))
            }
            _ => Err(Self::handle_error_response(response).await),
        }
    }

    async fn get_scan_status(&self, scan_id: Uuid) -> ApiResult<ScanStatus> {
        let url = self.endpoint_segments(&["scan-status", &scan_id.to_string()])?;
        let response = self.request(Method::GET, &url)?.send().await?;

        if response.status() == StatusCode::OK {
            response.json().await.map_err(|e| ApiError::InvalidResponse {
                message: format!("scan status response: {e}"),
            })
        } else {
            Err(Self::handle_error_response(response).await)
        }
    }

    async fn wait_for_scan_completion(
        &self,
        scan_ref: &str,
        poll_every: Duration,
    ) -> ApiResult<Vec<(TargetIdentifier, SecurityRating)>> {
        let scan_id = parse_scan_ref(scan_ref)?;

        loop {
            let status = match self.get_scan_status(scan_id).await {
                Ok(status) => status,
                // Honor Retry-After before the next tick, keep polling.
                Err(e) => match e.retry_after() {
                    Some(wait) => {
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    None => return Err(e),
                },
            };

            match status.status {
                ScanState::Completed => return self.fetch_completed_ratings(&status).await,
                ScanState::Failed => {
                    return Err(ApiError::ScanFailed {
                        message: status
                            .error_message
                            .unwrap_or_else(|| "scan failed".to_string()),
                    })
                }
                ScanState::Canceled => return Err(ApiError::ScanCanceled),
                ScanState::Queued | ScanState::Running | ScanState::Partial => {}
            }

            tokio::time::sleep(poll_every).await;
        }
    }
}

impl ApiClient {
    /// Fetch the rating behind each completed target carrying a rating URL.
    /// Targets in any other state are skipped silently.
    async fn fetch_completed_ratings(
        &self,
        status: &ScanStatus,
    ) -> ApiResult<Vec<(TargetIdentifier, SecurityRating)>> {
        let mut results = Vec::new();
        for target in &status.targets {
            if target.status != ScanTargetStatus::Completed {
                continue;
            }
            let Some(rating_url) = target.rating_url.as_deref().filter(|u| !u.is_empty()) else {
                continue;
            };
            let rating = self.fetch_rating_relative(rating_url).await?;
            results.push((target.identifier.clone(), rating));
        }
        Ok(results)
    }

    /// GET a `rating_url` relative to the API base.
    async fn fetch_rating_relative(&self, rating_url: &str) -> ApiResult<SecurityRating> {
        let url = self.endpoint(rating_url);
        let response = self.request(Method::GET, &url)?.send().await?;

        if response.status() == StatusCode::OK {
            let body: RatingResponse =
                response.json().await.map_err(|e| ApiError::InvalidResponse {
                    message: format!("rating response: {e}"),
                })?;
            body.ratings
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::InvalidResponse {
                    message: "empty rating response".to_string(),
                })
        } else {
            Err(Self::handle_error_response(response).await)
        }
    }
}

/// Extract a scan UUID from a raw UUID string or a `/scan-status/{uuid}` path.
fn parse_scan_ref(scan_ref: &str) -> ApiResult<Uuid> {
    let candidate = scan_ref
        .strip_prefix("/scan-status/")
        .map(|rest| rest.split('/').next().unwrap_or(rest))
        .unwrap_or(scan_ref);

    Uuid::parse_str(candidate).map_err(|_| ApiError::InvalidScanRef {
        reference: scan_ref.to_string(),
    })
}
