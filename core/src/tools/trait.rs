//! The `Tool` trait: a single callable unit registered under a unique name.

use async_trait::async_trait;
use serde_json::Value;

use super::spec::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};

/// A single tool invocable by the model.
///
/// Implementations register under [`Tool::name`] in the
/// [`ToolRegistry`](super::ToolRegistry); the name must be unique, and
/// [`Tool::spec`] is what gets surfaced to the model as a callable
/// capability.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> ToolSpec;

    async fn call(
        &self,
        args: Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
