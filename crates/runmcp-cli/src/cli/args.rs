use clap::{Parser, Subcommand};

use runmcp_store::DEFAULT_STORAGE_PATH;

#[derive(Parser)]
#[command(
    name = "run-mcp",
    version,
    about = "A fast, portable, single-binary security scanner for local Model Context Protocol (MCP) config files",
    long_about = "Discovers MCP configuration files and returns a security rating for each \
declared MCP server. Also detects security misconfigurations (i.e. long-lived secrets) and \
provides a gentle, client-side only way to apply security allow/deny rules for your MCP \
configurations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Enable detailed logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output results in JSON format instead of rich text
    #[arg(long, global = true, conflicts_with = "tui")]
    pub json: bool,

    /// Enable interactive mode with real-time progress
    #[arg(long, global = true)]
    pub tui: bool,

    /// Run the scanner in offline mode, only outputs findings without security ratings
    #[arg(long, global = true)]
    pub offline: bool,

    /// Organization UUID for reporting
    #[arg(long = "org-uuid", global = true)]
    pub org_uuid: Option<String>,

    /// Do not send any UUIDs or tracking information
    #[arg(long, visible_alias = "anon", global = true)]
    pub anonymous: bool,

    /// Location of the persisted results/allowlist blob
    #[arg(long = "storage-file", global = true, default_value = DEFAULT_STORAGE_PATH)]
    pub storage_file: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan one or more MCP config files [defaults to well-known locations]
    Scan(ScanArgs),
    /// Experimental features (subject to change)
    Experimental(ExperimentalArgs),
    /// Manage organization identity settings
    Org(OrgArgs),
}

#[derive(Parser)]
pub struct ScanArgs {
    /// Config files or directories to scan
    #[arg(value_name = "CONFIG_FILE")]
    pub paths: Vec<String>,
}

#[derive(Parser)]
pub struct ExperimentalArgs {
    #[command(subcommand)]
    pub cmd: ExperimentalCommand,
}

#[derive(Subcommand)]
pub enum ExperimentalCommand {
    /// Manage the local allowlist of approved entities
    Allowlist(AllowlistArgs),
    /// Actively enumerate a given MCP server to discover tool calls
    Inspect,
    /// Proxy tool_calls to/from this MCP server
    Proxy,
    /// Scan the entire filesystem to match on all MCP configs
    DeepScan,
}

#[derive(Parser)]
pub struct AllowlistArgs {
    #[command(subcommand)]
    pub cmd: Option<AllowlistCommand>,
}

#[derive(Subcommand)]
pub enum AllowlistCommand {
    /// Add an MCP server to the local allowlist
    Add {
        #[arg(value_name = "TYPE")]
        entity_type: String,
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "HASH")]
        hash: String,
    },
    /// Reset the entire local allowlist
    Reset,
}

#[derive(Parser)]
pub struct OrgArgs {
    #[command(subcommand)]
    pub cmd: OrgCommand,
}

#[derive(Subcommand)]
pub enum OrgCommand {
    /// Show the current organization UUID (if any)
    Show,
    /// Register and persist an organization UUID
    Register {
        #[arg(value_name = "UUID")]
        uuid: String,
    },
    /// Clear the persisted organization UUID
    Clear,
}
