//! MCP client support: stdio and Streamable HTTP transports, the JSON-RPC
//! wire shapes, and a manager that connects every configured server and
//! registers its allowed tools.

mod adapter;
mod config;
mod http;
mod protocol;
mod stdio;

use std::sync::Arc;

use serde_json::Value;

pub use adapter::McpToolAdapter;
pub use config::{McpServerConfig, McpTransportConfig};

use crate::tools::{ToolRegistry, ToolSourceError, ToolSpec};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error(transparent)]
    Stdio(#[from] stdio::McpTransportError),
    #[error(transparent)]
    Http(#[from] http::McpTransportError),
    #[error("{0}")]
    Remote(String),
    #[error(transparent)]
    ToolSource(#[from] ToolSourceError),
}

/// One connected MCP server, regardless of transport.
pub enum Transport {
    Stdio(stdio::StdioTransport),
    Http(http::HttpTransport),
}

impl Transport {
    async fn connect(
        config: &McpTransportConfig,
        client_name: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, McpError> {
        match config {
            McpTransportConfig::Stdio { command, args, env } => Ok(Transport::Stdio(
                stdio::StdioTransport::spawn(command, args, env, client_name, timeout).await?,
            )),
            McpTransportConfig::Http { url } => {
                Ok(Transport::Http(http::HttpTransport::connect(url, client_name, timeout).await?))
            }
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        match self {
            Transport::Stdio(t) => Ok(t.request(method, params).await?),
            Transport::Http(t) => Ok(t.request(method, params).await?),
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolSpec>, McpError> {
        let result = self.request("tools/list", serde_json::json!({})).await?;
        Ok(protocol::parse_list_tools_result(result)?)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<crate::tools::ToolCallContent, McpError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", params).await?;
        Ok(protocol::parse_call_tool_result(result)?)
    }
}

/// Connects every configured MCP server and registers its allowed tools
/// into a [`ToolRegistry`]. Connection is fail-fast: the first server that
/// cannot be reached or fails `initialize` aborts the whole startup, since a
/// misconfigured server silently dropped would be worse than a loud failure.
pub struct McpTransportManager {
    servers: Vec<(McpServerConfig, Arc<Transport>)>,
}

impl McpTransportManager {
    pub async fn connect_all(
        configs: &[McpServerConfig],
        client_name: &str,
    ) -> Result<Self, McpError> {
        let mut servers = Vec::with_capacity(configs.len());
        for config in configs {
            let transport = Transport::connect(&config.transport, client_name, config.timeout).await?;
            servers.push((config.clone(), Arc::new(transport)));
        }
        Ok(Self { servers })
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|(c, _)| c.name.as_str()).collect()
    }

    /// The configuration for one connected server, for introspection.
    pub fn server_config(&self, name: &str) -> Option<&McpServerConfig> {
        self.servers.iter().find(|(c, _)| c.name == name).map(|(c, _)| c)
    }

    /// Every tool one server advertises, unfiltered by allow/deny.
    pub async fn list_tools_for(&self, server_name: &str) -> Result<Vec<ToolSpec>, McpError> {
        let (_, transport) = self
            .servers
            .iter()
            .find(|(c, _)| c.name == server_name)
            .ok_or_else(|| McpError::Remote(format!("unknown mcp server: {server_name}")))?;
        transport.list_tools().await
    }

    /// Calls one tool on one server directly, bypassing the registry (used
    /// by the `mcp call` introspection command).
    pub async fn call_tool_on(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<crate::tools::ToolCallContent, McpError> {
        let (_, transport) = self
            .servers
            .iter()
            .find(|(c, _)| c.name == server_name)
            .ok_or_else(|| McpError::Remote(format!("unknown mcp server: {server_name}")))?;
        transport.call_tool(tool_name, arguments).await
    }

    /// Lists every allowed tool across every connected server, with its
    /// owning server name.
    pub async fn list_tools(&self) -> Result<Vec<(String, ToolSpec)>, McpError> {
        let mut out = Vec::new();
        for (config, transport) in &self.servers {
            for spec in transport.list_tools().await? {
                if config.is_allowed(&spec.name) {
                    out.push((config.name.clone(), spec));
                }
            }
        }
        Ok(out)
    }

    /// Registers every allowed tool, across every connected server, into
    /// `registry`. Tool names are expected to be unique across the combined
    /// server set; a collision surfaces through the registry's own
    /// duplicate-name error.
    pub async fn register_into(&self, registry: &mut ToolRegistry) -> Result<(), McpError> {
        for (config, transport) in &self.servers {
            for spec in transport.list_tools().await? {
                if !config.is_allowed(&spec.name) {
                    continue;
                }
                let adapter = McpToolAdapter::new(spec.name.clone(), spec, Arc::clone(transport));
                registry
                    .register(Arc::new(adapter))
                    .map_err(|e| McpError::Remote(e.to_string()))?;
            }
        }
        Ok(())
    }
}
