//! Summary generation and rendering groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::LocalPolicy;
use crate::models::{ScanResult, ServerReport};
use crate::secrets::SecretFinding;

/// High-level summary of a scan, the input to both renderers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub servers: Vec<ServerReport>,
    pub secrets: Vec<SecretFinding>,
    pub total_servers: usize,
    pub total_findings: usize,
    pub critical_findings: usize,
    pub high_findings: usize,
    pub medium_findings: usize,
    pub low_findings: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub scanned_files: usize,
}

/// Risk tier used only for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Critical,
    High,
    Medium,
    Low,
    None,
}

/// Convert a 0–10 risk score into a tier label.
pub fn risk_tier_from_score(score: f64) -> RiskTier {
    match score {
        s if s >= 9.0 => RiskTier::Critical,
        s if s >= 7.0 => RiskTier::High,
        s if s >= 4.0 => RiskTier::Medium,
        s if s > 0.0 => RiskTier::Low,
        _ => RiskTier::None,
    }
}

/// Flatten a scan result into a summary: one report per server with its
/// file's secrets attached by server name. Pure; ordering follows the input.
pub fn generate_summary(result: &ScanResult) -> ScanSummary {
    let mut summary = ScanSummary {
        started_at: Some(result.started_at),
        duration_ms: result.duration_ms,
        scanned_files: result.files.len(),
        ..ScanSummary::default()
    };

    for file in &result.files {
        for finding in &file.secret_findings {
            summary.secrets.push(finding.clone());
            summary.total_findings += 1;
        }
        for server in &file.servers {
            summary.total_servers += 1;
            summary.servers.push(ServerReport {
                name: server.name.clone(),
                path: file.path.clone(),
                secrets: file
                    .secret_findings
                    .iter()
                    .filter(|f| f.server_name == server.name)
                    .cloned()
                    .collect(),
                rating: None,
                local_policy: None,
            });
        }
    }

    summary
}

/// Servers grouped for rendering: explicit local policies first, then rated
/// servers bucketed by tier, then everything else as discovered.
#[derive(Debug, Default)]
pub struct SummaryBuckets<'a> {
    pub critical: Vec<&'a ServerReport>,
    pub high: Vec<&'a ServerReport>,
    pub medium: Vec<&'a ServerReport>,
    pub low: Vec<&'a ServerReport>,
    pub allowed: Vec<&'a ServerReport>,
    pub denied: Vec<&'a ServerReport>,
    pub pending: Vec<&'a ServerReport>,
    pub discovered: Vec<&'a ServerReport>,
}

/// Group the summary's servers into rendering buckets.
pub fn group_servers(summary: &ScanSummary) -> SummaryBuckets<'_> {
    let mut buckets = SummaryBuckets::default();
    for server in &summary.servers {
        match server.local_policy {
            Some(LocalPolicy::Allowed) => {
                buckets.allowed.push(server);
                continue;
            }
            Some(LocalPolicy::Denied) => {
                buckets.denied.push(server);
                continue;
            }
            Some(LocalPolicy::Pending) => {
                buckets.pending.push(server);
                continue;
            }
            Some(LocalPolicy::Unknown) | None => {}
        }
        if let Some(rating) = &server.rating {
            match risk_tier_from_score(rating.risk_score) {
                RiskTier::Critical => buckets.critical.push(server),
                RiskTier::High => buckets.high.push(server),
                RiskTier::Medium => buckets.medium.push(server),
                RiskTier::Low => buckets.low.push(server),
                RiskTier::None => buckets.discovered.push(server),
            }
            continue;
        }
        buckets.discovered.push(server);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileResult, ServerConfig};
    use crate::secrets::Confidence;
    use chrono::Utc;
    use runmcp_api::SecurityRating;

    fn rating(score: f64) -> SecurityRating {
        SecurityRating {
            hash: "sha256:test".into(),
            name: "pkg".into(),
            version: "1.0.0".into(),
            category: "TRUSTED".into(),
            risk_score: score,
            vulnerabilities: vec![],
            last_updated: Utc::now(),
            source: "api".into(),
        }
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(risk_tier_from_score(10.0), RiskTier::Critical);
        assert_eq!(risk_tier_from_score(9.0), RiskTier::Critical);
        assert_eq!(risk_tier_from_score(8.9), RiskTier::High);
        assert_eq!(risk_tier_from_score(7.0), RiskTier::High);
        assert_eq!(risk_tier_from_score(6.9), RiskTier::Medium);
        assert_eq!(risk_tier_from_score(4.0), RiskTier::Medium);
        assert_eq!(risk_tier_from_score(3.9), RiskTier::Low);
        assert_eq!(risk_tier_from_score(0.1), RiskTier::Low);
        assert_eq!(risk_tier_from_score(0.0), RiskTier::None);
    }

    fn sample_result() -> ScanResult {
        let finding = crate::secrets::SecretFinding::new(
            "git",
            "Generic Secret",
            "env.TOKEN",
            "Zq8kP3vN7xW2mR5tY9bL4cJ6",
            Confidence::Low,
            "claude.json",
            vec![4],
        );
        let mut result = ScanResult::new(vec!["claude.json".into()]);
        result.files.push(FileResult {
            path: "claude.json".into(),
            servers: vec![
                ServerConfig {
                    name: "filesystem".into(),
                    server: serde_json::json!({"command": "npx"}),
                },
                ServerConfig {
                    name: "git".into(),
                    server: serde_json::json!({"command": "git-mcp"}),
                },
            ],
            error: None,
            secret_findings: vec![finding],
        });
        result
    }

    #[test]
    fn summary_attaches_secrets_by_server_name() {
        let summary = generate_summary(&sample_result());
        assert_eq!(summary.total_servers, 2);
        assert_eq!(summary.total_findings, 1);
        assert_eq!(summary.scanned_files, 1);

        let git = summary.servers.iter().find(|s| s.name == "git").unwrap();
        assert_eq!(git.secrets.len(), 1);
        let fs = summary
            .servers
            .iter()
            .find(|s| s.name == "filesystem")
            .unwrap();
        assert!(fs.secrets.is_empty());
    }

    #[test]
    fn summary_is_a_pure_function_of_its_input() {
        let result = sample_result();
        let a = serde_json::to_value(generate_summary(&result)).unwrap();
        let b = serde_json::to_value(generate_summary(&result)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn grouping_prefers_explicit_policy_then_tier() {
        let mut summary = generate_summary(&sample_result());
        summary.servers[0].local_policy = Some(LocalPolicy::Allowed);
        summary.servers[1].rating = Some(rating(9.5));

        let buckets = group_servers(&summary);
        assert_eq!(buckets.allowed.len(), 1);
        assert_eq!(buckets.critical.len(), 1);
        assert!(buckets.discovered.is_empty());

        // Pending wins over an attached rating.
        summary.servers[1].local_policy = Some(LocalPolicy::Pending);
        let buckets = group_servers(&summary);
        assert_eq!(buckets.pending.len(), 1);
        assert!(buckets.critical.is_empty());
    }

    #[test]
    fn unrated_servers_without_policy_are_discovered() {
        let summary = generate_summary(&sample_result());
        let buckets = group_servers(&summary);
        assert_eq!(buckets.discovered.len(), 2);
    }
}
