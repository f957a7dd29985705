//! Per-server MCP configuration: how to reach it and which of its tools to
//! expose.

use std::collections::HashMap;
use std::time::Duration;

/// How to connect to one MCP server.
#[derive(Debug, Clone)]
pub enum McpTransportConfig {
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    Http {
        url: String,
    },
}

/// One configured MCP server: a name (used as a tool-name prefix when two
/// servers expose the same tool name), a transport, an optional allow/deny
/// filter over its advertised tools, and the per-request timeout to use on
/// its transport.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: McpTransportConfig,
    pub allow: Option<Vec<String>>,
    pub deny: Vec<String>,
    pub timeout: Duration,
}

impl McpServerConfig {
    pub fn is_allowed(&self, tool_name: &str) -> bool {
        if self.deny.iter().any(|d| d == tool_name) {
            return false;
        }
        match &self.allow {
            Some(allow) => allow.iter().any(|a| a == tool_name),
            None => true,
        }
    }
}
