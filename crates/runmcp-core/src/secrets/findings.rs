//! Secret findings and hash-keyed aggregation.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::detector::Confidence;
use super::redact::redact_secret;

/// A detected secret, redacted at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretFinding {
    /// Secret kind, e.g. "OpenAI API Key" or "Generic Secret".
    pub kind: String,

    /// Dotted path of the string within its server, `[i]` for array indices.
    pub key: String,

    /// Redacted value. The raw value never leaves the detector.
    pub value: String,

    /// File path → 1-based line numbers where the raw value occurs.
    pub occurrences: BTreeMap<String, Vec<u32>>,

    /// SHA-256 hex of the raw value; the grouping key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value_hash: String,

    /// Name of the server declaration the secret was found in.
    pub server_name: String,

    /// Detection confidence.
    pub confidence: Confidence,
}

impl SecretFinding {
    /// Build a finding from a raw value, redacting immediately and keeping
    /// only the hash of the raw bytes for grouping.
    pub fn new(
        server_name: &str,
        kind: &str,
        key: &str,
        raw_value: &str,
        confidence: Confidence,
        file_path: &str,
        lines: Vec<u32>,
    ) -> Self {
        let mut occurrences = BTreeMap::new();
        occurrences.insert(file_path.to_string(), lines);
        Self {
            kind: kind.to_string(),
            key: key.to_string(),
            value: redact_secret(raw_value),
            occurrences,
            value_hash: format!("{:x}", Sha256::digest(raw_value.as_bytes())),
            server_name: server_name.to_string(),
            confidence,
        }
    }
}

/// Aggregates findings by the hash of their raw values, merging occurrences,
/// and produces a deterministic, normalized list.
#[derive(Debug, Default)]
pub struct FindingSet {
    by_hash: HashMap<String, SecretFinding>,
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `incoming` into the set. Findings with an already-known value
    /// hash contribute only their occurrences.
    pub fn add(&mut self, incoming: SecretFinding) {
        match self.by_hash.get_mut(&incoming.value_hash) {
            Some(existing) => {
                for (file, lines) in incoming.occurrences {
                    existing.occurrences.entry(file).or_default().extend(lines);
                }
            }
            None => {
                self.by_hash.insert(incoming.value_hash.clone(), incoming);
            }
        }
    }

    /// Number of distinct secrets.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// All findings with per-file line lists deduplicated and sorted, ordered
    /// by `(server_name, kind, key, value_hash)` for stable output.
    pub fn list_sorted(&self) -> Vec<SecretFinding> {
        let mut out: Vec<SecretFinding> = self
            .by_hash
            .values()
            .cloned()
            .map(|mut finding| {
                for lines in finding.occurrences.values_mut() {
                    lines.sort_unstable();
                    lines.dedup();
                }
                finding
            })
            .collect();
        out.sort_by(|a, b| {
            (&a.server_name, &a.kind, &a.key, &a.value_hash)
                .cmp(&(&b.server_name, &b.kind, &b.key, &b.value_hash))
        });
        out
    }
}

/// All 1-based line numbers of lines in `content` containing `token`.
pub fn locate_lines(content: &[u8], token: &str) -> Vec<u32> {
    if token.is_empty() || content.is_empty() {
        return Vec::new();
    }
    let needle = token.as_bytes();
    content
        .split(|&b| b == b'\n')
        .enumerate()
        .filter(|(_, line)| contains_subslice(line, needle))
        .map(|(i, _)| i as u32 + 1)
        .collect()
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
