//! End-to-end pipeline tests over real files: classification, redaction,
//! finding aggregation, and identifier extraction on representative client
//! configs.

use std::io::Write;
use std::path::{Path, PathBuf};

use runmcp_core::{extract_identifiers, generate_summary, ConfigKind, McpScanner};
use runmcp_api::IdentifierKind;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn claude_config_yields_two_servers_and_no_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "claude_desktop_config.json",
        r#"{"mcpServers": {
            "filesystem": {"command": "python", "args": ["-m", "mcp.examples.filesystem", "/tmp"]},
            "git": {"command": "git-mcp-server", "env": {"GIT_REPOSITORY": "/path/to/repo"}}
        }}"#,
    );

    let doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
    assert_eq!(ConfigKind::detect(&doc), Some(ConfigKind::Claude));

    let mut scanner = McpScanner::new(vec![file.to_string_lossy().into_owned()]);
    let result = scanner.scan();

    assert_eq!(result.files.len(), 1);
    let names: Vec<&str> = result.servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["filesystem", "git"]);
    assert!(result.secret_findings.is_empty());

    // `git` has no URL and no recognized launcher.
    assert!(extract_identifiers("git", &result.servers[1].server).is_empty());
}

#[test]
fn vscode_url_and_npm_stdio_identifiers() {
    let github = serde_json::json!({"type": "http", "url": "https://api.githubcopilot.com/mcp/"});
    let context7 = serde_json::json!({"command": "npx", "args": ["-y", "@upstash/context7-mcp"]});

    let github_ids = extract_identifiers("github", &github);
    assert_eq!(github_ids.len(), 1);
    assert_eq!(github_ids[0].kind, IdentifierKind::Url);
    assert_eq!(github_ids[0].value, "https://api.githubcopilot.com/mcp");

    let context7_ids = extract_identifiers("context7", &context7);
    assert_eq!(context7_ids.len(), 1);
    assert_eq!(context7_ids[0].kind, IdentifierKind::Purl);
    assert_eq!(context7_ids[0].value, "pkg:npm/@upstash/context7-mcp");
}

#[test]
fn docker_oci_identifier() {
    let server = serde_json::json!({
        "command": "docker",
        "args": ["run", "-i", "--rm", "ghcr.io/github/github-mcp-server"]
    });
    let ids = extract_identifiers("github-container", &server);
    assert!(ids
        .iter()
        .any(|id| id.kind == IdentifierKind::Oci && id.value == "ghcr.io/github/github-mcp-server"));
}

#[test]
fn repo_inference_from_url_preserves_order() {
    let server = serde_json::json!({"url": "https://github.com/ensignia/run-mcp"});
    let ids: Vec<(IdentifierKind, String)> = extract_identifiers("server", &server)
        .into_iter()
        .map(|id| (id.kind, id.value))
        .collect();
    assert_eq!(
        ids,
        vec![
            (IdentifierKind::Url, "https://github.com/ensignia/run-mcp".to_string()),
            (IdentifierKind::Repo, "ensignia/run-mcp".to_string()),
        ]
    );
}

#[test]
fn openrouter_secret_merges_across_servers_and_redacts_everywhere() {
    let key = format!("sk-or-v1-{}", "0123456789abcdef".repeat(4));
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "mcp.json",
        &format!(
            r#"{{"mcpServers": {{
  "alpha": {{
    "command": "npx",
    "env": {{"OPENROUTER_API_KEY": "{key}"}},
    "args": ["--token", "{key}"]
  }},
  "beta": {{
    "env": {{"OPENROUTER_API_KEY": "{key}"}}
  }}
}}}}"#
        ),
    );

    let mut scanner = McpScanner::new(vec![file.to_string_lossy().into_owned()]);
    let result = scanner.scan();

    // One merged finding across both servers, keyed by value hash.
    assert_eq!(result.secret_findings.len(), 1);
    let finding = &result.secret_findings[0];
    assert_eq!(finding.kind, "OpenRouter API Key");
    assert_eq!(finding.confidence.to_string(), "HIGH");

    let file_key = file.to_string_lossy().into_owned();
    let lines = &finding.occurrences[&file_key];
    assert_eq!(lines.len(), 3, "three distinct lines carry the value");
    assert!(lines.windows(2).all(|w| w[0] < w[1]), "sorted, deduplicated");

    // Redaction totality: no artifact contains the raw value.
    let as_json = serde_json::to_string(&result).unwrap();
    assert!(!as_json.contains(&key));
    assert!(as_json.contains("sk-o"));

    let summary = generate_summary(&result);
    let summary_json = serde_json::to_string(&summary).unwrap();
    assert!(!summary_json.contains(&key));

    // Both servers surface the finding through the summary.
    let alpha = summary.servers.iter().find(|s| s.name == "alpha").unwrap();
    let beta = summary.servers.iter().find(|s| s.name == "beta").unwrap();
    assert_eq!(alpha.secrets.len(), 1);
    assert_eq!(beta.secrets.len(), 1);
}

#[test]
fn goose_yaml_config_is_scanned() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "config.yaml",
        "mcp_servers:\n  web-search:\n    command: uvx\n    args:\n      - mcp_server_search\n",
    );

    let mut scanner = McpScanner::new(vec![file.to_string_lossy().into_owned()]);
    let result = scanner.scan();
    assert_eq!(result.servers.len(), 1);
    assert_eq!(result.servers[0].name, "web-search");

    let ids = extract_identifiers("web-search", &result.servers[0].server);
    assert!(ids
        .iter()
        .any(|id| id.kind == IdentifierKind::Purl && id.value == "pkg:pypi/mcp-server-search"));
}

#[test]
fn colliding_keys_fail_the_file_without_emitting_servers() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "mcp.json",
        r#"{"mcpServers": {"a": {"command": "npx"}}, "mcpservers": {}}"#,
    );

    let mut scanner = McpScanner::new(vec![file.to_string_lossy().into_owned()]);
    let result = scanner.scan();
    assert_eq!(result.files.len(), 1);
    assert!(result.files[0].error.is_some());
    assert!(result.servers.is_empty());
    assert!(result.secret_findings.is_empty());
}

#[test]
fn summary_json_is_a_function_of_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "mcp.json",
        r#"{"servers": {"s": {"url": "https://example.com/api"}}}"#,
    );
    let mut scanner = McpScanner::new(vec![file.to_string_lossy().into_owned()]);
    let result = scanner.scan();

    let a = serde_json::to_value(generate_summary(&result)).unwrap();
    let b = serde_json::to_value(generate_summary(&result)).unwrap();
    assert_eq!(a, b);
}
