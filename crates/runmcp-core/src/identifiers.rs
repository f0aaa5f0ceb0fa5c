//! Heuristic extraction of canonical target identifiers from server
//! declarations.
//!
//! The heuristics run in a fixed order (URL, package launcher, container
//! launcher, repository hints, official-servers artifact) and their results
//! are appended in that order, deduplicated per `(kind, value)`. Extraction
//! is pure: no network, no global state.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use url::Url;

use runmcp_api::{IdentifierKind, TargetIdentifier};

/// Keys consulted for URL-shaped servers, in order.
const URL_KEYS: &[&str] = &["url", "endpoint", "baseUrl"];

/// Derive zero or more identifiers from one server declaration.
pub fn extract_identifiers(server_name: &str, server: &Value) -> Vec<TargetIdentifier> {
    let Some(cfg) = server.as_object() else {
        return Vec::new();
    };

    let mut out = Vec::new();

    // 1) URL-based servers (http/sse).
    for key in URL_KEYS {
        let raw = get_string(cfg, key);
        if raw.is_empty() {
            continue;
        }
        if let Some(normalized) = normalize_url(&raw) {
            out.push(TargetIdentifier {
                kind: IdentifierKind::Url,
                value: normalized,
            });
            break;
        }
    }

    // 2) Stdio package runners.
    if let Some(purl) = purl_from_stdio(cfg) {
        out.push(TargetIdentifier {
            kind: IdentifierKind::Purl,
            value: purl,
        });
    }

    // 3) OCI references inside docker/podman invocations.
    if let Some(reference) = oci_from_container(cfg) {
        out.push(TargetIdentifier {
            kind: IdentifierKind::Oci,
            value: reference,
        });
    }

    // 4a) Repository inference from the server name or an embedded VCS URL.
    if let Some((org, repo)) = repo_hint(cfg, server_name) {
        out.push(TargetIdentifier {
            kind: IdentifierKind::Repo,
            value: format!("{org}/{repo}"),
        });
    }
    // 4b) Official servers repo from built artifacts.
    if let Some(repo) = repo_from_node_dist(cfg) {
        out.push(TargetIdentifier {
            kind: IdentifierKind::Repo,
            value: repo,
        });
    }

    dedupe_identifiers(out)
}

/// Derive identifiers for every server in a config's servers map, sorted by
/// server name for a stable result, deduplicated across servers.
pub fn extract_identifiers_from_servers(
    servers: &crate::configs::ServerMap,
) -> Vec<TargetIdentifier> {
    let mut names: Vec<&String> = servers.keys().collect();
    names.sort();
    let all = names
        .into_iter()
        .filter_map(|name| servers.get(name).map(|server| (name, server)))
        .flat_map(|(name, server)| extract_identifiers(name, server))
        .collect();
    dedupe_identifiers(all)
}

fn get_string(map: &serde_json::Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn get_map<'a>(
    map: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Option<&'a serde_json::Map<String, Value>> {
    map.get(key).and_then(Value::as_object)
}

/// Parse and canonicalize a URL: require scheme and host, strip query and
/// fragment, strip one trailing slash from the path.
fn normalize_url(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    parsed.host_str()?;
    parsed.set_fragment(None);
    parsed.set_query(None);
    let path = parsed.path().to_string();
    if let Some(trimmed) = path.strip_suffix('/') {
        parsed.set_path(trimmed);
    }
    let mut rendered = parsed.to_string();
    // An empty path renders as a bare "/" which the canonical form omits.
    if parsed.path() == "/" && rendered.ends_with('/') {
        rendered.pop();
    }
    Some(rendered)
}

lazy_static! {
    // npm tokens like @scope/name@version or name in npx invocations.
    static ref NPM_PKG_RE: Regex =
        Regex::new(r"^(?:@[^/]+/)?[^@\s]+(?:@[^\s]+)?$").expect("npm package pattern must compile");
}

/// Flatten `command` (string or list) and `args` (list) into launch tokens.
fn launch_tokens(map: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut tokens = Vec::new();
    match map.get("command") {
        Some(Value::Array(items)) => tokens.extend(items.iter().filter_map(scalar_token)),
        Some(Value::String(s)) if !s.is_empty() => tokens.push(s.clone()),
        _ => {}
    }
    if let Some(Value::Array(args)) = map.get("args") {
        tokens.extend(args.iter().filter_map(scalar_token));
    }
    tokens
}

fn scalar_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Infer a purl from npx/uvx/python/pipx launchers, looking at the server
/// itself or a nested `stdio` mapping when present.
fn purl_from_stdio(cfg: &serde_json::Map<String, Value>) -> Option<String> {
    let stdio = get_map(cfg, "stdio").unwrap_or(cfg);
    let tokens = launch_tokens(stdio);
    if tokens.is_empty() {
        return None;
    }

    // npx: first non-flag token after the launcher is the package.
    for (i, token) in tokens.iter().enumerate() {
        if token != "npx" {
            continue;
        }
        for candidate in &tokens[i + 1..] {
            if candidate.starts_with('-') {
                continue;
            }
            if is_npm_package_token(candidate) {
                return Some(format!("pkg:npm/{candidate}"));
            }
            break;
        }
    }

    // uvx <pkg>, python -m <module>, pipx run <pkg>.
    for (i, token) in tokens.iter().enumerate() {
        if token == "uvx" {
            if let Some(candidate) = tokens.get(i + 1) {
                if is_py_token(candidate) {
                    return Some(pypi_purl(candidate));
                }
            }
        }
        if (token == "python" || token == "python3")
            && tokens.get(i + 1).map(String::as_str) == Some("-m")
        {
            if let Some(module) = tokens.get(i + 2) {
                if is_py_token(module) {
                    return Some(pypi_purl(module));
                }
            }
        }
        if token == "pipx" && tokens.get(i + 1).map(String::as_str) == Some("run") {
            if let Some(candidate) = tokens.get(i + 2) {
                if is_py_token(candidate) {
                    return Some(pypi_purl(candidate));
                }
            }
        }
    }

    None
}

fn is_npm_package_token(token: &str) -> bool {
    !token.is_empty() && !token.contains(' ') && NPM_PKG_RE.is_match(token)
}

fn is_py_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | ':' | '@'))
}

fn pypi_purl(token: &str) -> String {
    format!("pkg:pypi/{}", token.replace('_', "-"))
}

/// Infer an OCI image reference from a docker/podman `run` invocation,
/// consuming the value after each option flag that takes one.
fn oci_from_container(cfg: &serde_json::Map<String, Value>) -> Option<String> {
    let mut tokens = launch_tokens(cfg);
    if let Some(stdio) = get_map(cfg, "stdio") {
        tokens.extend(launch_tokens(stdio));
    }
    if tokens.is_empty() {
        return None;
    }

    for (i, token) in tokens.iter().enumerate() {
        if token != "docker" && token != "podman" {
            continue;
        }
        if tokens.get(i + 1).map(String::as_str) != Some("run") {
            continue;
        }
        let mut j = i + 2;
        while j < tokens.len() {
            let current = &tokens[j];
            if current.starts_with('-') {
                if flag_takes_value(current) && j + 1 < tokens.len() {
                    j += 1;
                }
                j += 1;
                continue;
            }
            if looks_like_oci_ref(current) {
                return Some(current.clone());
            }
            break;
        }
    }
    None
}

fn flag_takes_value(flag: &str) -> bool {
    matches!(
        flag,
        "-e" | "--env" | "-v" | "--volume" | "-p" | "--publish" | "--name" | "--network"
    )
}

/// A bare token is an OCI ref when it contains `/` and its first segment
/// looks like a registry host (contains `.` or `:`).
fn looks_like_oci_ref(token: &str) -> bool {
    if !token.contains('/') || token.contains(' ') {
        return false;
    }
    let host = token.split('/').next().unwrap_or_default();
    host.contains('.') || host.contains(':')
}

/// Infer `org/repo` from the server name or an embedded GitHub/GitLab URL.
fn repo_hint(
    cfg: &serde_json::Map<String, Value>,
    server_name: &str,
) -> Option<(String, String)> {
    let name = server_name.replace(' ', "").replace('_', "-");
    if name.contains('/') {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }
    if name.contains('-') {
        let parts: Vec<&str> = name.split('-').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    for key in URL_KEYS {
        let raw = get_string(cfg, key);
        if raw.is_empty() {
            continue;
        }
        let Ok(parsed) = Url::parse(&raw) else {
            continue;
        };
        let segments: Vec<&str> = parsed
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let host = parsed.host_str().unwrap_or_default();
        if host_equal(host, "github.com") && segments.len() >= 2 {
            return Some((
                segments[0].to_string(),
                trim_git_suffix(segments[1]).to_string(),
            ));
        }
        if host_equal(host, "gitlab.com") && segments.len() >= 2 {
            return Some((
                segments[segments.len() - 2].to_string(),
                trim_git_suffix(segments[segments.len() - 1]).to_string(),
            ));
        }
    }
    None
}

fn trim_git_suffix(s: &str) -> &str {
    s.strip_suffix(".git").unwrap_or(s)
}

fn host_equal(a: &str, b: &str) -> bool {
    a.trim_end_matches(":443").eq_ignore_ascii_case(b.trim_end_matches(":443"))
}

/// The official servers repo, when executing built artifacts via
/// `node dist/<name>/index.js`.
fn repo_from_node_dist(cfg: &serde_json::Map<String, Value>) -> Option<String> {
    let mut command = get_string(cfg, "command");
    if command.is_empty() {
        if let Some(stdio) = get_map(cfg, "stdio") {
            command = get_string(stdio, "command");
        }
    }
    if command != "node" {
        return None;
    }

    let first_arg = first_list_entry(cfg, "args")
        .or_else(|| get_map(cfg, "stdio").and_then(|stdio| first_list_entry(stdio, "args")))
        .unwrap_or_default();
    if first_arg.starts_with("dist/") && first_arg.ends_with("/index.js") {
        return Some("modelcontextprotocol/servers".to_string());
    }
    None
}

fn first_list_entry(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items.first().and_then(scalar_token),
        _ => None,
    }
}

/// Dedupe per `(kind, value)`, preserving first occurrence.
fn dedupe_identifiers(identifiers: Vec<TargetIdentifier>) -> Vec<TargetIdentifier> {
    let mut seen = std::collections::HashSet::new();
    identifiers
        .into_iter()
        .filter(|id| !id.value.is_empty() && seen.insert((id.kind, id.value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(name: &str, server: Value) -> Vec<(IdentifierKind, String)> {
        extract_identifiers(name, &server)
            .into_iter()
            .map(|id| (id.kind, id.value))
            .collect()
    }

    #[test]
    fn plain_stdio_servers_yield_nothing() {
        // `python -m mcp.examples.filesystem` has a dotted module (valid), so
        // check the truly-empty cases around it.
        assert!(extract("git", json!({"command": "git-mcp-server", "env": {"GIT_REPOSITORY": "/path/to/repo"}})).is_empty());
        assert!(extract("solo", json!({"command": "some-binary-with-many-parts"})).is_empty());
        assert!(extract("empty", json!({})).is_empty());
        assert!(extract("notmap", json!("string")).is_empty());
    }

    #[test]
    fn url_servers_normalize() {
        assert_eq!(
            extract(
                "github",
                json!({"type": "http", "url": "https://api.githubcopilot.com/mcp/"})
            ),
            vec![(
                IdentifierKind::Url,
                "https://api.githubcopilot.com/mcp".to_string()
            )]
        );
        // Query and fragment are stripped; bare hosts lose the trailing slash.
        assert_eq!(
            extract("q", json!({"endpoint": "https://example.com/?q=1#frag"})),
            vec![(IdentifierKind::Url, "https://example.com".to_string())]
        );
        // Relative or schemeless values are ignored.
        assert!(extract("bad", json!({"url": "not a url"})).is_empty());
    }

    #[test]
    fn url_key_order_takes_first_nonempty() {
        let ids = extract(
            "multi",
            json!({"baseUrl": "https://base.example.com", "url": "https://url.example.com"}),
        );
        assert_eq!(
            ids[0],
            (IdentifierKind::Url, "https://url.example.com".to_string())
        );
    }

    #[test]
    fn npx_package_becomes_npm_purl() {
        assert_eq!(
            extract(
                "context7",
                json!({"command": "npx", "args": ["-y", "@upstash/context7-mcp"]})
            ),
            vec![(
                IdentifierKind::Purl,
                "pkg:npm/@upstash/context7-mcp".to_string()
            )]
        );
        // Flags between npx and the package are skipped.
        assert_eq!(
            extract(
                "versioned",
                json!({"command": "npx", "args": ["--yes", "-q", "server-name@1.2.3"]})
            ),
            vec![(IdentifierKind::Purl, "pkg:npm/server-name@1.2.3".to_string())]
        );
    }

    #[test]
    fn nested_stdio_mapping_is_consulted() {
        assert_eq!(
            extract(
                "nested",
                json!({"stdio": {"command": "npx", "args": ["-y", "@scope/pkg"]}})
            ),
            vec![(IdentifierKind::Purl, "pkg:npm/@scope/pkg".to_string())]
        );
    }

    #[test]
    fn python_launchers_become_pypi_purls() {
        assert_eq!(
            extract("uvx", json!({"command": "uvx", "args": ["mcp_server_git"]})),
            vec![(IdentifierKind::Purl, "pkg:pypi/mcp-server-git".to_string())]
        );
        assert_eq!(
            extract(
                "pym",
                json!({"command": "python", "args": ["-m", "mcp_server.tools"]})
            ),
            vec![(IdentifierKind::Purl, "pkg:pypi/mcp-server.tools".to_string())]
        );
        assert_eq!(
            extract(
                "pipx",
                json!({"command": "pipx", "args": ["run", "some_tool"]})
            ),
            vec![(IdentifierKind::Purl, "pkg:pypi/some-tool".to_string())]
        );
        // python3 -m with command expressed as a list.
        assert_eq!(
            extract(
                "listcmd",
                json!({"command": ["python3", "-m", "mcp.examples.filesystem"], "args": []})
            ),
            vec![(
                IdentifierKind::Purl,
                "pkg:pypi/mcp.examples.filesystem".to_string()
            )]
        );
    }

    #[test]
    fn docker_run_yields_oci_reference() {
        assert_eq!(
            extract(
                "githubmcp",
                json!({"command": "docker", "args": ["run", "-i", "--rm", "ghcr.io/github/github-mcp-server"]})
            ),
            vec![(
                IdentifierKind::Oci,
                "ghcr.io/github/github-mcp-server".to_string()
            )]
        );
    }

    #[test]
    fn docker_value_flags_are_consumed() {
        assert_eq!(
            extract(
                "withenv",
                json!({"command": "docker", "args": [
                    "run", "-e", "TOKEN", "--volume", "/data:/data",
                    "-p", "8080:8080", "registry.example.com:5000/org/image:tag"
                ]})
            ),
            vec![(
                IdentifierKind::Oci,
                "registry.example.com:5000/org/image:tag".to_string()
            )]
        );
        // A bare token without a registry-ish first segment stops the scan.
        assert!(extract(
            "plainimage",
            json!({"command": "docker", "args": ["run", "ubuntu/latest"]})
        )
        .is_empty());
    }

    #[test]
    fn repo_hint_from_server_name() {
        assert_eq!(
            extract("acme/mcp", json!({})),
            vec![(IdentifierKind::Repo, "acme/mcp".to_string())]
        );
        // Underscores normalize to hyphens before the two-part split.
        assert_eq!(
            extract("acme_mcp", json!({})),
            vec![(IdentifierKind::Repo, "acme/mcp".to_string())]
        );
        // Three segments are ambiguous, not a repo.
        assert!(extract("a-b-c", json!({})).is_empty());
    }

    #[test]
    fn repo_from_github_url_keeps_extraction_order() {
        // URL identifier first, repo hint second.
        assert_eq!(
            extract("server", json!({"url": "https://github.com/ensignia/run-mcp"})),
            vec![
                (
                    IdentifierKind::Url,
                    "https://github.com/ensignia/run-mcp".to_string()
                ),
                (IdentifierKind::Repo, "ensignia/run-mcp".to_string()),
            ]
        );
    }

    #[test]
    fn repo_from_gitlab_takes_last_two_segments_and_trims_git() {
        let ids = extract(
            "server",
            json!({"url": "https://gitlab.com/group/subgroup/project.git"}),
        );
        assert!(ids.contains(&(IdentifierKind::Repo, "subgroup/project".to_string())));
    }

    #[test]
    fn node_dist_artifact_maps_to_official_servers_repo() {
        assert_eq!(
            extract(
                "everything",
                json!({"command": "node", "args": ["dist/everything/index.js"]})
            ),
            vec![(
                IdentifierKind::Repo,
                "modelcontextprotocol/servers".to_string()
            )]
        );
        assert!(extract(
            "otherjs",
            json!({"command": "node", "args": ["server.js"]})
        )
        .is_empty());
    }

    #[test]
    fn bulk_extraction_sorts_by_name_and_dedupes_across_servers() {
        let mut servers = crate::configs::ServerMap::new();
        servers.insert(
            "zeta".into(),
            json!({"command": "npx", "args": ["-y", "@acme/shared"]}),
        );
        servers.insert(
            "alpha".into(),
            json!({"command": "npx", "args": ["-y", "@acme/shared"]}),
        );
        servers.insert(
            "mid".into(),
            json!({"url": "https://example.com/api"}),
        );

        let ids: Vec<(IdentifierKind, String)> = extract_identifiers_from_servers(&servers)
            .into_iter()
            .map(|id| (id.kind, id.value))
            .collect();
        // alpha's purl comes first (sorted names), the shared purl appears
        // once, and mid's URL follows.
        assert_eq!(
            ids,
            vec![
                (IdentifierKind::Purl, "pkg:npm/@acme/shared".to_string()),
                (IdentifierKind::Url, "https://example.com/api".to_string()),
            ]
        );
    }

    #[test]
    fn extraction_is_idempotent_and_deduplicated() {
        let server = json!({
            "url": "https://github.com/acme/tool",
            "command": "npx",
            "args": ["-y", "@acme/tool"]
        });
        let first = extract_identifiers("acme-tool", &server);
        let second = extract_identifiers("acme-tool", &server);
        assert_eq!(first, second);

        let mut pairs: Vec<(IdentifierKind, &str)> = first
            .iter()
            .map(|id| (id.kind, id.value.as_str()))
            .collect();
        let before = pairs.len();
        pairs.dedup();
        assert_eq!(pairs.len(), before, "no duplicate (kind, value) pairs");
    }
}
