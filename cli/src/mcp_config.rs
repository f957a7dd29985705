//! Converts the config-file-shaped MCP server entries into the transport
//! manager's own config type.

use std::collections::HashMap;

use config::McpServerConfig as ResolvedMcpServer;
use config::McpTransportKind;
use cpe_core::mcp::{McpServerConfig, McpTransportConfig};

pub fn to_core_config(resolved: &[ResolvedMcpServer]) -> Vec<McpServerConfig> {
    resolved
        .iter()
        .map(|server| {
            let transport = match server.transport {
                McpTransportKind::Stdio => McpTransportConfig::Stdio {
                    command: server.command.clone().unwrap_or_default(),
                    args: server.args.clone(),
                    env: HashMap::new(),
                },
                McpTransportKind::Http => McpTransportConfig::Http {
                    url: server.url.clone().unwrap_or_default(),
                },
            };
            McpServerConfig {
                name: server.name.clone(),
                transport,
                allow: server.enabled_tools.clone(),
                deny: server.disabled_tools.clone().unwrap_or_default(),
                timeout: server.timeout,
            }
        })
        .collect()
}
