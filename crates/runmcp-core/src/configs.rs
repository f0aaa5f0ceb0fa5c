//! Config schema classification and the uniform servers view.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ParseError;
use crate::reader::detect_case_insensitive_key_collisions;

/// A single server declaration: the raw JSON/YAML substructure keyed by the
/// server name.
pub type Server = serde_json::Map<String, Value>;

/// Named servers, insertion order preserved.
pub type ServerMap = serde_json::Map<String, Value>;

/// The closed set of recognized MCP config schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigKind {
    Claude,
    VSCodeConfig,
    VSCodeMcp,
    Continue,
    Goose,
    LibreChat,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Claude => "ClaudeConfigFile",
            Self::VSCodeConfig => "VSCodeConfigFile",
            Self::VSCodeMcp => "VSCodeMCPConfig",
            Self::Continue => "ContinueConfigFile",
            Self::Goose => "GooseConfigFile",
            Self::LibreChat => "LibreChatConfigFile",
        };
        f.write_str(name)
    }
}

impl ConfigKind {
    /// Classify a decoded document.
    ///
    /// The predicates run in a fixed order and the first match wins; this
    /// order is part of the external contract and keeps any given document
    /// stably classified.
    pub fn detect(doc: &Value) -> Option<ConfigKind> {
        let map = doc.as_object()?;
        if map.contains_key("mcpServers") {
            return Some(Self::Claude);
        }
        if map.contains_key("servers") {
            return Some(Self::VSCodeMcp);
        }
        if has_nested(doc, &["mcp", "servers"]) {
            return Some(Self::VSCodeConfig);
        }
        if map.contains_key("mcp") {
            return Some(Self::Continue);
        }
        if map.contains_key("mcp_servers") {
            return Some(Self::Goose);
        }
        if has_nested(doc, &["mcp", "servers"]) {
            return Some(Self::LibreChat);
        }
        None
    }
}

fn has_nested(doc: &Value, keys: &[&str]) -> bool {
    let mut cur = doc;
    for key in keys {
        match cur.as_object().and_then(|m| m.get(*key)) {
            Some(next) => cur = next,
            None => return false,
        }
    }
    true
}

/// Claude Desktop / Claude Code: `{"mcpServers": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaudeConfigFile {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: ServerMap,
}

/// VS Code `mcp.json`: `{"servers": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VSCodeMcpConfig {
    #[serde(default)]
    pub servers: ServerMap,
}

/// VS Code `settings.json`: `{"mcp": {"servers": {...}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VSCodeConfigFile {
    #[serde(default)]
    pub mcp: Option<VSCodeMcpConfig>,
}

/// Continue `config.yaml`: `{"mcp": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContinueConfigFile {
    #[serde(default)]
    pub mcp: ServerMap,
}

/// Goose `config.yaml`: `{"mcp_servers": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GooseConfigFile {
    #[serde(default)]
    pub mcp_servers: ServerMap,
}

/// LibreChat `librechat.yaml`: `{"mcp": {"servers": {...}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibreChatConfigFile {
    #[serde(default)]
    pub mcp: LibreChatMcpSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibreChatMcpSection {
    #[serde(default)]
    pub servers: ServerMap,
}

/// A typed config of one of the recognized kinds.
#[derive(Debug, Clone)]
pub enum McpConfig {
    Claude(ClaudeConfigFile),
    VSCodeConfig(VSCodeConfigFile),
    VSCodeMcp(VSCodeMcpConfig),
    Continue(ContinueConfigFile),
    Goose(GooseConfigFile),
    LibreChat(LibreChatConfigFile),
}

impl McpConfig {
    /// Decode `doc` into the typed shape for `kind`.
    pub fn parse(kind: ConfigKind, doc: Value) -> Result<Self, ParseError> {
        let schema_err = |e: serde_json::Error| ParseError::Schema {
            kind: kind.to_string(),
            message: e.to_string(),
        };
        Ok(match kind {
            ConfigKind::Claude => Self::Claude(serde_json::from_value(doc).map_err(schema_err)?),
            ConfigKind::VSCodeConfig => {
                Self::VSCodeConfig(serde_json::from_value(doc).map_err(schema_err)?)
            }
            ConfigKind::VSCodeMcp => {
                Self::VSCodeMcp(serde_json::from_value(doc).map_err(schema_err)?)
            }
            ConfigKind::Continue => {
                Self::Continue(serde_json::from_value(doc).map_err(schema_err)?)
            }
            ConfigKind::Goose => Self::Goose(serde_json::from_value(doc).map_err(schema_err)?),
            ConfigKind::LibreChat => {
                Self::LibreChat(serde_json::from_value(doc).map_err(schema_err)?)
            }
        })
    }

    /// The schema this config was decoded as.
    pub fn kind(&self) -> ConfigKind {
        match self {
            Self::Claude(_) => ConfigKind::Claude,
            Self::VSCodeConfig(_) => ConfigKind::VSCodeConfig,
            Self::VSCodeMcp(_) => ConfigKind::VSCodeMcp,
            Self::Continue(_) => ConfigKind::Continue,
            Self::Goose(_) => ConfigKind::Goose,
            Self::LibreChat(_) => ConfigKind::LibreChat,
        }
    }

    /// The named servers of this config, filtered through the per-server
    /// collision re-check.
    pub fn servers(&self) -> ServerMap {
        filter_servers(self.raw_servers())
    }

    fn raw_servers(&self) -> &ServerMap {
        lazy_static::lazy_static! {
            static ref EMPTY: ServerMap = ServerMap::new();
        }
        match self {
            Self::Claude(c) => &c.mcp_servers,
            Self::VSCodeConfig(c) => c.mcp.as_ref().map(|m| &m.servers).unwrap_or(&EMPTY),
            Self::VSCodeMcp(c) => &c.servers,
            Self::Continue(c) => &c.mcp,
            Self::Goose(c) => &c.mcp_servers,
            Self::LibreChat(c) => &c.mcp.servers,
        }
    }

    /// Write a (redacted) servers map back into the config.
    pub fn set_servers(&mut self, servers: ServerMap) {
        match self {
            Self::Claude(c) => c.mcp_servers = servers,
            Self::VSCodeConfig(c) => {
                c.mcp.get_or_insert_with(VSCodeMcpConfig::default).servers = servers;
            }
            Self::VSCodeMcp(c) => c.servers = servers,
            Self::Continue(c) => c.mcp = servers,
            Self::Goose(c) => c.mcp_servers = servers,
            Self::LibreChat(c) => c.mcp.servers = servers,
        }
    }
}

/// Drop servers whose own sub-document carries a case-insensitive key
/// collision (or is not a mapping at all), logging a warning for each.
pub fn filter_servers(servers: &ServerMap) -> ServerMap {
    let mut valid = ServerMap::new();
    for (name, server) in servers {
        if !server.is_object() {
            warn!(server = %name, "skipping server: declaration is not a mapping");
            continue;
        }
        if let Err(e) = detect_case_insensitive_key_collisions(server) {
            warn!(server = %name, error = %e, "skipping invalid config for server");
            continue;
        }
        valid.insert(name.clone(), server.clone());
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detection_order_is_fixed() {
        assert_eq!(
            ConfigKind::detect(&json!({"mcpServers": {}})),
            Some(ConfigKind::Claude)
        );
        assert_eq!(
            ConfigKind::detect(&json!({"servers": {}})),
            Some(ConfigKind::VSCodeMcp)
        );
        assert_eq!(
            ConfigKind::detect(&json!({"mcp": {"servers": {}}})),
            Some(ConfigKind::VSCodeConfig)
        );
        assert_eq!(
            ConfigKind::detect(&json!({"mcp": {"context7": {}}})),
            Some(ConfigKind::Continue)
        );
        assert_eq!(
            ConfigKind::detect(&json!({"mcp_servers": {}})),
            Some(ConfigKind::Goose)
        );
        assert_eq!(ConfigKind::detect(&json!({"other": {}})), None);
        assert_eq!(ConfigKind::detect(&json!([1, 2])), None);
    }

    #[test]
    fn claude_beats_vscode_when_both_keys_present() {
        let doc = json!({"mcpServers": {}, "servers": {}});
        assert_eq!(ConfigKind::detect(&doc), Some(ConfigKind::Claude));
    }

    #[test]
    fn classification_is_stable() {
        let doc = json!({"mcp": {"servers": {"a": {"command": "npx"}}}});
        let first = ConfigKind::detect(&doc);
        for _ in 0..10 {
            assert_eq!(ConfigKind::detect(&doc), first);
        }
    }

    #[test]
    fn servers_view_per_kind() {
        let claude = McpConfig::parse(
            ConfigKind::Claude,
            json!({"mcpServers": {"fs": {"command": "npx"}}}),
        )
        .unwrap();
        assert!(claude.servers().contains_key("fs"));

        let vscode = McpConfig::parse(
            ConfigKind::VSCodeConfig,
            json!({"mcp": {"servers": {"github": {"url": "https://x.test"}}}}),
        )
        .unwrap();
        assert!(vscode.servers().contains_key("github"));

        let goose = McpConfig::parse(
            ConfigKind::Goose,
            json!({"mcp_servers": {"g": {"command": "uvx"}}}),
        )
        .unwrap();
        assert!(goose.servers().contains_key("g"));
    }

    #[test]
    fn filter_drops_colliding_servers_and_keeps_rest() {
        let config = McpConfig::parse(
            ConfigKind::Claude,
            json!({"mcpServers": {
                "good": {"command": "npx"},
                "bad": {"env": {"Token": "a", "token": "b"}}
            }}),
        )
        .unwrap();
        let servers = config.servers();
        assert!(servers.contains_key("good"));
        assert!(!servers.contains_key("bad"));
    }

    #[test]
    fn filter_drops_non_mapping_servers() {
        let config = McpConfig::parse(
            ConfigKind::VSCodeMcp,
            json!({"servers": {"weird": "not-a-map", "ok": {"command": "npx"}}}),
        )
        .unwrap();
        let servers = config.servers();
        assert_eq!(servers.len(), 1);
        assert!(servers.contains_key("ok"));
    }

    #[test]
    fn servers_view_is_idempotent() {
        let mut config = McpConfig::parse(
            ConfigKind::Claude,
            json!({"mcpServers": {
                "good": {"command": "npx"},
                "bad": {"env": {"Token": "a", "token": "b"}}
            }}),
        )
        .unwrap();
        let filtered = config.servers();
        config.set_servers(filtered.clone());
        assert_eq!(config.servers(), filtered);
    }
}
