//! Wraps one tool advertised by an MCP server as a local [`Tool`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

use super::{McpError, Transport};

pub struct McpToolAdapter {
    name: String,
    spec: ToolSpec,
    transport: Arc<Transport>,
}

impl McpToolAdapter {
    pub fn new(name: String, spec: ToolSpec, transport: Arc<Transport>) -> Self {
        Self { name, spec, transport }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.transport
            .call_tool(&self.name, args)
            .await
            .map_err(|e| match e {
                McpError::Remote(msg) => ToolSourceError::JsonRpc(msg),
                other => ToolSourceError::Transport(other.to_string()),
            })
    }
}
