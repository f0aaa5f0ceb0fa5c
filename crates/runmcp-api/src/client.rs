//! Health-gated HTTP client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::identity::Identity;
use crate::types::{ErrorBody, HealthResponse, HealthStatus};

/// Production API base.
pub const DEFAULT_BASE_URL: &str = "https://mcp.ensignia.com/api/v1";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound on the one-shot health probe.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

// Split so the literal never appears verbatim in the binary's string table.
const PUBLISHABLE_KEY_PARTS: [&str; 8] = [
    "ens", "_pk_live_", "0002f8", "b9f396", "fde908", "63e430", "b5849c", "491115515e",
];

fn default_publishable_key() -> String {
    PUBLISHABLE_KEY_PARTS.concat()
}

fn default_user_agent() -> String {
    format!(
        "run-mcp/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Builder for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    base_url: String,
    publishable_key: String,
    identity: Identity,
    timeout: Duration,
    skip_health_probe: bool,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            publishable_key: default_publishable_key(),
            identity: Identity::default(),
            timeout: DEFAULT_TIMEOUT,
            skip_health_probe: false,
        }
    }
}

impl ApiClientBuilder {
    /// Override the API base URL (production or tests).
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    /// Override the bearer publishable key
    /// (expected format: `ens_pk_live_<40 hex chars>`).
    pub fn publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = key.into();
        self
    }

    /// Default identity attached to every request. A
    /// [`with_identity`](crate::identity::with_identity) scope overrides it
    /// per task.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Per-request timeout (default 3s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable the initial `/health` probe. Intended for tests that do not
    /// expose a health endpoint.
    pub fn skip_health_probe(mut self) -> Self {
        self.skip_health_probe = true;
        self
    }

    /// Build the client and perform the one-shot health probe.
    ///
    /// Returns [`ApiError::Offline`] when the probe fails; the caller is
    /// expected to fall back to a purely local run.
    pub async fn connect(self) -> ApiResult<ApiClient> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&default_user_agent()) {
            default_headers.insert(USER_AGENT, ua);
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        let client = ApiClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            publishable_key: self.publishable_key,
            identity: self.identity,
            offline: AtomicBool::new(false),
        };

        if !self.skip_health_probe {
            client.probe_health().await?;
        }
        Ok(client)
    }
}

/// Typed client for the ratings control plane.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    publishable_key: String,
    identity: Identity,

    // Set once by the health probe, consulted lock-free on every request.
    offline: AtomicBool,
}

impl ApiClient {
    /// Start building a client with defaults.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Whether the health probe marked this client offline.
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }

    /// API base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One-shot probe of `/health`. Anything other than a 2xx reporting
    /// `healthy` flips the offline flag and fails with [`ApiError::Offline`].
    async fn probe_health(&self) -> ApiResult<()> {
        let url = self.endpoint("/health");
        debug!(url = %url, "probing control plane health");

        let response = self
            .http
            .get(&url)
            .timeout(HEALTH_PROBE_TIMEOUT)
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await;

        let healthy = match response {
            Ok(resp) if resp.status().is_success() => {
                // Best-effort decode; any 2xx without a readable body counts
                // as healthy, an explicit degraded/unhealthy does not.
                match resp.json::<HealthResponse>().await {
                    Ok(hr) => hr.status == HealthStatus::Healthy,
                    Err(_) => true,
                }
            }
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "health probe rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "health probe unreachable");
                false
            }
        };

        if !healthy {
            self.offline.store(true, Ordering::Relaxed);
            return Err(ApiError::Offline);
        }
        Ok(())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.publishable_key)
    }

    /// Join a relative path (possibly pre-escaped, e.g. a `rating_url`) onto
    /// the API base.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build an endpoint URL from raw segments, percent-escaping each one.
    pub(crate) fn endpoint_segments(&self, segments: &[&str]) -> ApiResult<String> {
        let mut url = url::Url::parse(&self.base_url).map_err(|e| ApiError::Validation {
            message: format!("invalid base URL: {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation {
                message: "base URL cannot carry path segments".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    /// Start an authenticated request, short-circuiting when offline.
    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> ApiResult<reqwest::RequestBuilder> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(ApiError::Offline);
        }

        let mut req = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, self.bearer());

        // A task-scoped identity overrides the client default.
        let scoped = crate::identity::scoped_identity();
        let identity = scoped.as_ref().unwrap_or(&self.identity);
        if !identity.anonymous {
            if let Some(org) = &identity.org_uuid {
                req = req.header("X-Org-Uuid", org);
            }
            if let Some(host) = &identity.host_uuid {
                req = req.header("X-Host-Uuid", host);
            }
        }
        Ok(req)
    }

    /// Map a non-success response to the error taxonomy, consuming the body.
    pub(crate) async fn handle_error_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body: ErrorBody = response.json().await.unwrap_or_default();

        match status.as_u16() {
            400 => ApiError::Validation {
                message: body.message,
            },
            401 => ApiError::Unauthorized {
                message: body.message,
            },
            404 => ApiError::NotFound {
                message: body.message,
            },
            429 => ApiError::RateLimited { retry_after },
            code => ApiError::Remote {
                status: code,
                message: body.message,
                request_id: body.request_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishable_key_has_expected_shape() {
        let key = default_publishable_key();
        assert!(key.starts_with("ens_pk_live_"));
        assert_eq!(key.len(), "ens_pk_live_".len() + 40);
    }

    #[test]
    fn user_agent_names_product_and_platform() {
        let ua = default_user_agent();
        assert!(ua.starts_with("run-mcp/"));
        assert!(ua.contains(std::env::consts::OS));
        assert!(ua.contains(std::env::consts::ARCH));
    }
}
