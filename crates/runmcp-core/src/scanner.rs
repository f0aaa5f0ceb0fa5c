//! Scan orchestrator: walks targets, streams discovered files, and drives
//! per-file parsing, redaction, and identifier submission.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::collector::RatingsCollector;
use crate::configs::{ConfigKind, McpConfig};
use crate::models::{FileResult, ScanError, ScanResult, ServerConfig};
use crate::paths::{is_json_or_yaml_file, is_skipped_dir, is_well_known_mcp_filename};
use crate::reader::{decode, read_config};
use crate::secrets::{FindingSet, SecretScanContext};

/// One streaming event. `path == ""` with `complete == true` is the sentinel
/// meaning the whole scan finished.
#[derive(Debug)]
pub struct ScanEvent<'a> {
    pub path: &'a str,
    pub result: Option<&'a FileResult>,
    pub error: Option<&'a ScanError>,
    pub complete: bool,
}

/// Observer of per-file progress. Invoked from the scan thread; a concurrent
/// UI is responsible for its own thread-safe fan-in.
pub type StreamingCallback = Box<dyn Fn(&ScanEvent<'_>) + Send>;

/// Walks targets and produces a [`ScanResult`].
pub struct McpScanner {
    targets: Vec<String>,
    seen_files: HashSet<PathBuf>,
    collector: Option<Arc<RatingsCollector>>,
    callback: Option<StreamingCallback>,
    findings: FindingSet,
}

impl McpScanner {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            targets,
            seen_files: HashSet::new(),
            collector: None,
            callback: None,
            findings: FindingSet::new(),
        }
    }

    /// Attach a ratings collector for live enrichment.
    pub fn with_ratings_collector(mut self, collector: Arc<RatingsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Attach a callback for real-time file processing updates.
    pub fn with_streaming_callback(mut self, callback: StreamingCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Scan all targets. Per-file errors are recorded on the file results and
    /// never abort the scan.
    pub fn scan(&mut self) -> ScanResult {
        debug!(targets = self.targets.len(), "starting scan");
        let mut result = ScanResult::new(self.targets.clone());

        let targets = self.targets.clone();
        for target in &targets {
            let path = Path::new(target);
            let meta = match std::fs::metadata(path) {
                Ok(meta) => meta,
                Err(e) => {
                    debug!(target = %target, error = %e, "skipping target");
                    continue;
                }
            };

            if meta.is_dir() {
                let base = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                if is_skipped_dir(base) {
                    debug!(target = %target, "skipping directory due to skip rules");
                    continue;
                }
                self.walk_directory(path, &mut result);
            } else {
                self.process_file(path, &mut result);
            }
        }

        result.secret_findings = self.findings.list_sorted();
        let completed = chrono::Utc::now();
        result.duration_ms = (completed - result.started_at)
            .num_milliseconds()
            .max(0) as u64;
        result.completed_at = Some(completed);

        self.emit(&ScanEvent {
            path: "",
            result: None,
            error: None,
            complete: true,
        });
        debug!("scan completed");
        result
    }

    /// Stream config-looking files out of a directory tree, pruning skipped
    /// directories.
    fn walk_directory(&mut self, root: &Path, result: &mut ScanResult) {
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_str().unwrap_or_default();
            !(entry.file_type().is_dir() && is_skipped_dir(name))
        });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_str().unwrap_or_default();
            if is_well_known_mcp_filename(name) || is_json_or_yaml_file(entry.path()) {
                self.process_file(entry.path(), result);
            }
        }
    }

    /// Process one file at most once across the whole scan.
    fn process_file(&mut self, path: &Path, result: &mut ScanResult) {
        if !self.seen_files.insert(path.to_path_buf()) {
            return;
        }
        let display_path = path.to_string_lossy().into_owned();

        self.emit(&ScanEvent {
            path: &display_path,
            result: None,
            error: None,
            complete: false,
        });

        let file_result = self.scan_file(path, &display_path);
        self.emit(&ScanEvent {
            path: &display_path,
            result: Some(&file_result),
            error: file_result.error.as_ref(),
            complete: false,
        });

        if !file_result.servers.is_empty() {
            result.servers.extend(file_result.servers.iter().cloned());
        }
        result.files.push(file_result);
    }

    fn scan_file(&mut self, path: &Path, display_path: &str) -> FileResult {
        debug!(path = %display_path, "scanning file");
        let mut file_result = FileResult::new(display_path);

        let content = match read_config(path) {
            Ok(content) => content,
            Err(e) => {
                if e.is_not_found() {
                    debug!(path = %display_path, "file not found");
                } else {
                    warn!(path = %display_path, error = %e, "failed to read file");
                }
                file_result.error = Some(ScanError::new(e.to_string()));
                return file_result;
            }
        };

        let doc = match decode(path, &content) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(path = %display_path, error = %e, "could not decode config");
                file_result.error = Some(ScanError::new(e.to_string()));
                return file_result;
            }
        };

        let Some(kind) = ConfigKind::detect(&doc) else {
            debug!(path = %display_path, "unknown config kind");
            return file_result;
        };

        let config = match McpConfig::parse(kind, doc) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %display_path, error = %e, "failed to decode config schema");
                file_result.error = Some(ScanError::new(e.to_string()));
                return file_result;
            }
        };

        let servers = config.servers();
        if servers.is_empty() {
            debug!(path = %display_path, kind = %kind, "no servers declared");
            return file_result;
        }

        // Redact secrets in every server declaration, then surface the
        // redacted subtrees in the result and to the collector.
        let mut ctx = SecretScanContext::new(display_path, content);
        for (name, server) in servers {
            debug!(server = %name, "found server");
            let redacted = ctx.traverse_server(&name, server);
            if let Some(collector) = &self.collector {
                collector.submit(&name, &redacted);
            }
            file_result.servers.push(ServerConfig {
                name,
                server: redacted,
            });
        }

        let findings = ctx.into_findings();
        for finding in &findings {
            self.findings.add(finding.clone());
        }
        file_result.secret_findings = findings;

        file_result
    }

    fn emit(&self, event: &ScanEvent<'_>) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}
