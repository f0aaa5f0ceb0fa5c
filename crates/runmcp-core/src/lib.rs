//! Core scanning pipeline for MCP configuration files.
//!
//! The pipeline streams discovered config files through decode → classify →
//! secret-redact → identifier-extract, submits identifiers to a debounced
//! batching collector, and aggregates everything into a deterministic scan
//! result:
//!
//! - [`reader`] reads bounded files and decodes JSON/YAML with a
//!   case-insensitive key-collision guard.
//! - [`configs`] classifies a decoded document into one of the known MCP
//!   client schemas and exposes a uniform servers view.
//! - [`secrets`] detects provider and high-entropy secrets, redacts them in
//!   place, and merges findings by value hash.
//! - [`identifiers`] derives canonical target identifiers (purl, OCI ref,
//!   repository, URL) from a server declaration.
//! - [`collector`] batches identifier submissions to the ratings API and fans
//!   asynchronous results back out to server names.
//! - [`scanner`] walks targets and drives per-file processing.
//! - [`summary`] folds a scan result into the rendered report model.

pub mod collector;
pub mod configs;
pub mod error;
pub mod identifiers;
pub mod models;
pub mod paths;
pub mod reader;
pub mod scanner;
pub mod secrets;
pub mod summary;

pub use collector::{CollectorConfig, LocalPolicy, RatingsCollector};
pub use configs::{ConfigKind, McpConfig, Server, ServerMap};
pub use error::ParseError;
pub use identifiers::{extract_identifiers, extract_identifiers_from_servers};
pub use models::{FileResult, ScanError, ScanResult, ServerConfig, ServerReport};
pub use scanner::{McpScanner, ScanEvent};
pub use secrets::{
    classify_secret_value, redact_secret, Confidence, FindingSet, SecretFinding, SecretScanContext,
};
pub use summary::{
    generate_summary, group_servers, risk_tier_from_score, RiskTier, ScanSummary, SummaryBuckets,
};
