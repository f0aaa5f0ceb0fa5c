//! Well-known MCP config locations and filename filters.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Filenames that are MCP configs regardless of their directory.
pub const WELL_KNOWN_MCP_FILENAMES: &[&str] = &[
    // Claude Code
    "managed-settings.json",
    "settings.json",
    "mcp.json",
    // Continue
    "config.yaml",
    ".continuerc.json",
    "config.json",
    // LibreChat
    "librechat.yaml",
    // Common
    "mcp_config.json",
    "mcp_settings.json",
];

/// Directories never descended into.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    ".ssh",
    ".npm",
    "node_modules",
    "dist",
    "build",
    "target",
    "__pycache__",
    ".pyenv",
    ".cache",
];

const WELL_KNOWN_PATHS_MACOS: &[&str] = &[
    // Claude Code
    "~/Library/Application Support/Claude/managed-settings.json",
    // VS Code
    "~/Library/Application Support/Code/User/settings.json",
    "~/Library/Application Support/Code/User/mcp.json",
    // Cursor
    "~/Library/Application Support/Cursor/User/settings.json",
    // VS Code Insiders
    "~/Library/Application Support/Code - Insiders/User/settings.json",
    "~/Library/Application Support/Code - Insiders/User/mcp.json",
    // Windsurf Editor
    "~/.codeium/windsurf/mcp_config.json",
    // Zed
    "~/Library/Application Support/Zed/settings.json",
    // Continue
    "~/.continue/config.yaml",
    "~/.continuerc.json",
    // Goose
    "~/Library/Application Support/goose/config.yaml",
    // Roo Code
    "~/Library/Application Support/Roo Code/mcp.json",
    // BoltAI
    "~/Library/Application Support/BoltAI/mcp.json",
    // Witsy
    "~/Library/Application Support/Witsy/mcp.json",
    // Enconvo
    "~/Library/Application Support/Enconvo/mcp.json",
    // Warp
    "~/Library/Application Support/dev.warp.Warp-Stable/config/settings.yaml",
];

const WELL_KNOWN_PATHS_LINUX: &[&str] = &[
    // Claude Code
    "/etc/claude-code/managed-settings.json",
    // VS Code
    "~/.config/Code/User/settings.json",
    "~/.config/Code/User/mcp.json",
    // Cursor
    "~/.config/Cursor/settings.json",
    "~/.cursor/settings.json",
    "~/.cursor/mcp.json",
    "~/.cursor/mcp_config.json",
    "~/.cursor/mcp_settings.json",
    // Zed
    "~/.config/zed/settings.json",
    // Goose
    "~/.config/goose/config.yaml",
    // Roo Code
    "~/.config/roo-code/mcp.json",
    "~/.roo/mcp.json",
    // BoltAI
    "~/.config/boltai/mcp.json",
    // Witsy
    "~/.config/witsy/mcp.json",
    // Enconvo
    "~/.config/enconvo/mcp.json",
    // Warp
    "~/.local/state/warp-terminal/config/settings.yaml",
];

const WELL_KNOWN_PATHS_WINDOWS: &[&str] = &[
    // Claude Code
    "C:\\ProgramData\\ClaudeCode\\managed-settings.json",
    // VS Code
    "$APPDATA\\Code\\User\\settings.json",
    "$APPDATA\\Code\\User\\mcp.json",
    // VS Code Insiders
    "$APPDATA\\Code - Insiders\\User\\settings.json",
    "$APPDATA\\Code - Insiders\\User\\mcp.json",
    // Cursor
    "$APPDATA\\Cursor\\settings.json",
    "$USERPROFILE\\.cursor",
    "$USERPROFILE\\.cursor\\settings.json",
    "$USERPROFILE\\.cursor\\mcp.json",
    "$USERPROFILE\\.cursor\\mcp_config.json",
    "$USERPROFILE\\.cursor\\mcp_settings.json",
    // Windsurf Editor
    "$USERPROFILE\\.codeium\\windsurf\\mcp_config.json",
    // Zed
    "$APPDATA\\Zed\\settings.json",
    // Continue
    "$USERPROFILE\\.continue\\config.yaml",
    "$USERPROFILE\\.continuerc.json",
    // Cline
    "$USERPROFILE\\.cline\\mcp_config.json",
    // Amazon Q CLI
    "$USERPROFILE\\.aws\\amazonq\\cli-config.json",
    // Other assistants
    "$USERPROFILE\\.claude\\mcp.json",
    "$USERPROFILE\\.gemini\\mcp.json",
    "$USERPROFILE\\.grok\\mcp.json",
    "$USERPROFILE\\.chatgpt\\mcp.json",
    "$USERPROFILE\\.openai\\mcp.json",
    "$USERPROFILE\\.anthropic\\mcp.json",
    "$USERPROFILE\\.xai\\mcp.json",
    "$USERPROFILE\\.codex\\mcp.json",
    // Roo Code
    "$APPDATA\\Roo Code\\mcp.json",
    // BoltAI
    "$APPDATA\\BoltAI\\mcp.json",
    // Witsy
    "$APPDATA\\Witsy\\mcp.json",
    // Enconvo
    "$APPDATA\\Enconvo\\mcp.json",
    // Warp
    "$LOCALAPPDATA\\warp\\Warp\\config\\settings.yaml",
];

const WELL_KNOWN_PATHS_UNIX: &[&str] = &[
    // Claude Code
    "~/.claude/settings.json",
    "~/.claude/mcp.json",
    // Windsurf Editor
    "~/.codeium/windsurf/mcp_config.json",
    // Cline (legacy)
    "~/.cline/mcp_config.json",
    // Continue
    "~/.continue/config.yaml",
    "~/.continuerc.json",
    // Amazon Q CLI
    "~/.aws/amazonq/cli-config.json",
    // Cursor
    "~/.cursor",
    "~/.cursor/settings.json",
    "~/.cursor/mcp.json",
    "~/.cursor/mcp_config.json",
    "~/.cursor/mcp_settings.json",
    // Other assistants
    "~/.gemini/mcp.json",
    "~/.grok/mcp.json",
    "~/.chatgpt/mcp.json",
    "~/.openai/mcp.json",
    "~/.anthropic/mcp.json",
    "~/.xai/mcp.json",
    "~/.codex/mcp.json",
    // Roo Code
    "~/.roo/mcp.json",
    // BoltAI
    "~/.boltai/mcp.json",
    // Witsy
    "~/.witsy/mcp.json",
    // Enconvo
    "~/.enconvo/mcp.json",
];

/// Project-level relative paths, resolved against plausible roots.
const WELL_KNOWN_PATHS_PROJECT: &[&str] = &[
    // Claude Code
    ".claudecode/mcp.json",
    ".claude/mcp.json",
    ".mcp.json",
    // VS Code
    ".vscode/settings.json",
    ".vscode-insiders/settings.json",
    // Continue
    ".continue/config.yaml",
    ".continuerc.json",
    ".continue/config.json",
    // Roo Code
    ".roo/mcp.json",
    // BoltAI
    ".boltai/mcp.json",
    // Witsy
    ".witsy/mcp.json",
    // Enconvo
    ".enconvo/mcp.json",
    // Generic assistants
    ".gemini/mcp.json",
    ".grok/mcp.json",
    ".chatgpt/mcp.json",
    ".openai/mcp.json",
    ".anthropic/mcp.json",
    ".xai/mcp.json",
    ".codex/mcp.json",
    // Cursor
    ".cursor",
    ".cursor/settings.json",
    ".cursor/mcp.json",
    ".cursor/mcp_config.json",
    ".cursor/mcp_settings.json",
    // LibreChat
    "librechat.yaml",
    // LM Studio & common
    "mcp.json",
    "mcp_config.json",
    "mcp_settings.json",
];

/// Well-known MCP config paths for the current OS, tilde- and env-expanded.
pub fn well_known_mcp_paths() -> Vec<PathBuf> {
    let mut raw: Vec<String> = Vec::new();
    match std::env::consts::OS {
        "macos" => {
            raw.extend(WELL_KNOWN_PATHS_MACOS.iter().map(|s| s.to_string()));
            raw.extend(WELL_KNOWN_PATHS_UNIX.iter().map(|s| s.to_string()));
        }
        "linux" => {
            raw.extend(WELL_KNOWN_PATHS_LINUX.iter().map(|s| s.to_string()));
            raw.extend(WELL_KNOWN_PATHS_UNIX.iter().map(|s| s.to_string()));
        }
        "windows" => {
            raw.extend(WELL_KNOWN_PATHS_WINDOWS.iter().map(|s| s.to_string()));
        }
        _ => {}
    }

    for root in project_roots() {
        for rel in WELL_KNOWN_PATHS_PROJECT {
            raw.push(root.join(rel).to_string_lossy().into_owned());
        }
    }

    raw.iter()
        .filter_map(|path| match expand_path(path) {
            Some(expanded) => Some(expanded),
            None => {
                debug!(path = %path, "failed to expand well-known path");
                None
            }
        })
        .collect()
}

/// Plausible roots for project-level paths: the working directory and the
/// enclosing git repository root, if any.
fn project_roots() -> Vec<PathBuf> {
    let mut roots = Vec::with_capacity(2);
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(repo) = find_git_root(&cwd) {
            if repo != cwd {
                roots.push(repo);
            }
        }
        roots.insert(0, cwd);
    }
    roots
}

/// Walk up from `start` until a directory containing `.git` is found.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Expand `~`, `$VAR` and `${VAR}` in a path.
pub fn expand_path(path: &str) -> Option<PathBuf> {
    let tilde_expanded = if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()?.join(rest).to_string_lossy().into_owned()
    } else if path == "~" {
        dirs::home_dir()?.to_string_lossy().into_owned()
    } else {
        path.to_string()
    };
    Some(PathBuf::from(expand_env_vars(&tilde_expanded)))
}

/// Expand `$VAR` and `${VAR}` references; unset variables expand to empty.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                out.push_str(&std::env::var(&name).unwrap_or_default());
            }
            Some((_, c)) if c.is_ascii_alphanumeric() || *c == '_' => {
                let mut name = String::new();
                while let Some((_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || *c == '_' {
                        name.push(*c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&std::env::var(&name).unwrap_or_default());
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Whether `path` has a `.yaml`/`.yml` extension.
pub fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("yaml") | Some("yml")
    )
}

/// Whether `path` has a `.json` extension.
pub fn is_json_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("json")
    )
}

/// Whether `path` is JSON or YAML by extension.
pub fn is_json_or_yaml_file(path: &Path) -> bool {
    is_json_file(path) || is_yaml_file(path)
}

/// Whether `name` is one of the well-known MCP config filenames.
pub fn is_well_known_mcp_filename(name: &str) -> bool {
    WELL_KNOWN_MCP_FILENAMES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
}

/// Whether `name` is a directory the scanner never descends into.
pub fn is_skipped_dir(name: &str) -> bool {
    SKIP_DIRS.iter().any(|dir| dir.eq_ignore_ascii_case(name))
}
