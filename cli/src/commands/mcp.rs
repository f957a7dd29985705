//! `mcp list|info|list-tools|call`: MCP server introspection, independent
//! of any particular model.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use cpe_core::mcp::McpTransportManager;

use crate::commands::{mcp_servers_from_file, read_config_file};
use crate::{to_core_config, CliError};

#[derive(Args, Debug, Clone)]
pub struct McpArgs {
    #[command(subcommand)]
    pub cmd: McpCommand,

    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum McpCommand {
    /// List every configured MCP server.
    List,
    /// Show one server's transport configuration.
    Info { server: String },
    /// List tools one server advertises.
    ListTools {
        server: String,
        /// Show every advertised tool, ignoring the configured allow/deny filters.
        #[arg(long)]
        all: bool,
        /// Show only the tools this config's allow/deny filters admit (default).
        #[arg(long, conflicts_with = "all")]
        filtered: bool,
    },
    /// Call one tool on one server directly, bypassing the tool registry.
    Call {
        server: String,
        tool: String,
        /// JSON object of arguments.
        json_args: String,
    },
}

pub async fn run(args: McpArgs) -> Result<(), CliError> {
    let (content, path) = read_config_file(args.config.as_deref())?;
    let file = config::parse_file(&content)
        .map_err(|e| config::ResolveError::MalformedConfig(path.display().to_string(), e))?;
    let servers = mcp_servers_from_file(&file)?;

    match args.cmd {
        McpCommand::List => {
            for s in &servers {
                println!("{}", s.name);
            }
        }
        McpCommand::Info { server } => {
            let s = servers
                .iter()
                .find(|s| s.name == server)
                .ok_or_else(|| CliError::Usage(format!("unknown mcp server: {server}")))?;
            println!("name: {}", s.name);
            println!("transport: {:?}", s.transport);
            if let Some(cmd) = &s.command {
                println!("command: {cmd} {}", s.args.join(" "));
            }
            if let Some(url) = &s.url {
                println!("url: {url}");
            }
        }
        McpCommand::ListTools { server, all, filtered: _ } => {
            let configs = to_core_config(&servers);
            let manager = McpTransportManager::connect_all(&configs, "cpe").await?;
            if all {
                for spec in manager.list_tools_for(&server).await? {
                    println!("{}", spec.name);
                }
            } else {
                for (owner, spec) in manager.list_tools().await? {
                    if owner == server {
                        println!("{}", spec.name);
                    }
                }
            }
        }
        McpCommand::Call { server, tool, json_args } => {
            let configs = to_core_config(&servers);
            let manager = McpTransportManager::connect_all(&configs, "cpe").await?;
            let arguments: serde_json::Value = serde_json::from_str(&json_args)
                .map_err(|e| CliError::Usage(format!("invalid json arguments: {e}")))?;
            let result = manager.call_tool_on(&server, &tool, arguments).await?;
            println!("{}", result.text);
        }
    }
    Ok(())
}
