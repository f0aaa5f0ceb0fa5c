//! Per-file secret scanning and in-place redaction.

use serde_json::Value;

use super::detector::classify_secret_value;
use super::findings::{locate_lines, FindingSet, SecretFinding};
use super::redact::redact_secret;

/// Per-file scanning state. Walks server declarations, replaces secret string
/// leaves with their redacted form, erases the raw bytes from the in-memory
/// file buffer, and aggregates findings by value hash.
pub struct SecretScanContext {
    file_path: String,
    file_content: Vec<u8>,
    original_content: Vec<u8>,
    findings: FindingSet,
    current_server: String,
}

impl SecretScanContext {
    pub fn new(file_path: impl Into<String>, file_content: Vec<u8>) -> Self {
        Self {
            file_path: file_path.into(),
            original_content: file_content.clone(),
            file_content,
            findings: FindingSet::new(),
            current_server: String::new(),
        }
    }

    /// Traverse one server declaration, returning its redacted form.
    pub fn traverse_server(&mut self, server_name: &str, data: Value) -> Value {
        self.current_server = server_name.to_string();
        self.traverse(data, "")
    }

    // The shape of a config is JSON-like: maps of general values (recursed
    // through), maps of ENV values and lists of ARGS values (where secrets
    // live). Recurse until a string leaf.
    fn traverse(&mut self, data: Value, dot_path: &str) -> Value {
        match data {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| {
                        let child = self.traverse(value, &child_key_path(dot_path, &key));
                        (key, child)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| self.traverse(value, &format!("{dot_path}[{i}]")))
                    .collect(),
            ),
            Value::String(s) => Value::String(self.handle_string(dot_path, s)),
            other => other,
        }
    }

    fn handle_string(&mut self, dot_path: &str, s: String) -> String {
        if s.is_empty() {
            return s;
        }
        let Some(found) = classify_secret_value(&s) else {
            return s;
        };

        let redacted = redact_secret(&s);
        let lines = locate_lines(&self.original_content, &s);
        self.findings.add(SecretFinding::new(
            &self.current_server,
            found.kind,
            dot_path,
            &s,
            found.confidence,
            &self.file_path,
            lines,
        ));
        // Erase every occurrence of the raw bytes from the file buffer.
        self.file_content = replace_all_bytes(&self.file_content, s.as_bytes(), redacted.as_bytes());
        redacted
    }

    /// Aggregated findings, deterministically ordered.
    pub fn into_findings(self) -> Vec<SecretFinding> {
        self.findings.list_sorted()
    }

    /// The file buffer after redaction.
    pub fn redacted_content(&self) -> &[u8] {
        &self.file_content
    }
}

fn child_key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Replace every occurrence of `needle` in `haystack`.
fn replace_all_bytes(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if i + needle.len() <= haystack.len() && &haystack[i..i + needle.len()] == needle {
            out.extend_from_slice(replacement);
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn openrouter_key() -> String {
        format!("sk-or-v1-{}", "0123456789abcdef".repeat(4))
    }

    #[test]
    fn traversal_redacts_string_leaves_and_records_paths() {
        let key = openrouter_key();
        let raw = format!(
            "{{\"env\":{{\"OPENROUTER_API_KEY\":\"{key}\"}},\"args\":[\"-y\",\"{key}\"]}}"
        );
        let server = json!({
            "env": {"OPENROUTER_API_KEY": key},
            "args": ["-y", key],
        });

        let mut ctx = SecretScanContext::new("config.json", raw.clone().into_bytes());
        let redacted = ctx.traverse_server("openrouter", server);

        let redacted_value = redacted["env"]["OPENROUTER_API_KEY"].as_str().unwrap();
        assert_ne!(redacted_value, key);
        assert!(redacted_value.starts_with("sk-o"));
        assert!(redacted_value.ends_with("..."));
        assert_eq!(redacted["args"][1].as_str().unwrap(), redacted_value);
        assert_eq!(redacted["args"][0].as_str().unwrap(), "-y");

        // Raw bytes are gone from the buffer.
        assert!(!String::from_utf8_lossy(ctx.redacted_content()).contains(&key));

        let findings = ctx.into_findings();
        assert_eq!(findings.len(), 1, "same value collapses to one finding");
        let finding = &findings[0];
        assert_eq!(finding.kind, "OpenRouter API Key");
        assert_eq!(finding.server_name, "openrouter");
        assert_eq!(finding.key, "env.OPENROUTER_API_KEY");
        assert_eq!(finding.occurrences["config.json"], vec![1]);
    }

    #[test]
    fn occurrences_collect_line_numbers_per_file() {
        let key = openrouter_key();
        let raw = format!("line1\n\"{key}\"\nline3\n\"{key}\"\n");
        let mut ctx = SecretScanContext::new("multi.json", raw.into_bytes());
        ctx.traverse_server("srv", json!({"env": {"K": key}}));

        let findings = ctx.into_findings();
        assert_eq!(findings[0].occurrences["multi.json"], vec![2, 4]);
    }

    #[test]
    fn non_string_leaves_pass_through() {
        let mut ctx = SecretScanContext::new("c.json", b"{}".to_vec());
        let server = json!({"port": 8080, "enabled": true, "extra": null});
        let out = ctx.traverse_server("plain", server.clone());
        assert_eq!(out, server);
        assert!(ctx.into_findings().is_empty());
    }

    #[test]
    fn replace_all_bytes_handles_overlaps_and_ends() {
        assert_eq!(replace_all_bytes(b"abcabc", b"abc", b"x"), b"xx".to_vec());
        assert_eq!(replace_all_bytes(b"abc", b"zzz", b"x"), b"abc".to_vec());
        assert_eq!(replace_all_bytes(b"ab", b"abc", b"x"), b"ab".to_vec());
    }
}
