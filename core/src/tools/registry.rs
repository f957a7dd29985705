//! Mapping from tool name to either a callable tool or a terminator marker.
//!
//! A terminator entry has no callback by design (the spec's `nil`
//! `ToolCallback`): the tool-loop middleware recognizes it and stops the
//! loop instead of invoking anything, surfacing the call's parameters to
//! the caller. Used for subagent structured output (`final_answer`).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::spec::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use super::r#trait::Tool;

enum RegisteredTool {
    Callback(Arc<dyn Tool>),
    Terminator(ToolSpec),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool {0} is already registered")]
    DuplicateName(String),
}

/// A tool's outcome, as it will be recorded on a `tool_result` block.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

/// Built once per pipeline invocation, then read-only for its lifetime.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.tools.insert(name, RegisteredTool::Callback(tool));
        Ok(())
    }

    /// Registers a terminator tool: invoking it ends the tool loop without
    /// running a callback.
    pub fn register_terminator(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.tools.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateName(spec.name));
        }
        self.tools.insert(spec.name.clone(), RegisteredTool::Terminator(spec));
        Ok(())
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|t| match t {
                RegisteredTool::Callback(tool) => tool.spec(),
                RegisteredTool::Terminator(spec) => spec.clone(),
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_terminator(&self, name: &str) -> bool {
        matches!(self.tools.get(name), Some(RegisteredTool::Terminator(_)))
    }

    /// Drops every registered tool whose name is not in `allowed`. Used to
    /// restrict a subagent's registry to the names its config lists.
    pub fn retain_named(&mut self, allowed: &[String]) {
        self.tools.retain(|name, _| allowed.iter().any(|a| a == name));
    }

    /// Calls a registered tool. Unknown-tool and callback failures are
    /// folded into `ToolOutcome { is_error: true }` rather than propagated,
    /// per the tool-loop contract (a failed tool call is not a pipeline
    /// failure). Calling a terminator tool is a programming error in this
    /// crate — the tool loop must check [`is_terminator`](Self::is_terminator)
    /// first and never reach here for one.
    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: Option<&ToolCallContext>,
    ) -> ToolOutcome {
        match self.tools.get(name) {
            None => ToolOutcome {
                content: format!("unknown tool: {name}"),
                is_error: true,
            },
            Some(RegisteredTool::Terminator(_)) => {
                unreachable!("terminator tools must be intercepted by the tool loop")
            }
            Some(RegisteredTool::Callback(tool)) => match tool.call(args, ctx).await {
                Ok(ToolCallContent { text }) => ToolOutcome {
                    content: text,
                    is_error: false,
                },
                Err(ToolSourceError::NotFound(msg))
                | Err(ToolSourceError::InvalidInput(msg))
                | Err(ToolSourceError::Transport(msg))
                | Err(ToolSourceError::JsonRpc(msg)) => ToolOutcome {
                    content: msg,
                    is_error: true,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".to_string(),
                description: None,
                input_schema: serde_json::json!({}),
                output_schema: None,
            }
        }
        async fn call(
            &self,
            args: Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent { text: args.to_string() })
        }
    }

    #[tokio::test]
    async fn registering_same_name_twice_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let err = registry.register(Arc::new(EchoTool)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn calling_unknown_tool_returns_error_outcome_not_err() {
        let registry = ToolRegistry::new();
        let outcome = registry.call("nope", serde_json::json!({}), None).await;
        assert!(outcome.is_error);
    }

    #[tokio::test]
    async fn retain_named_drops_everything_not_listed() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        registry
            .register_terminator(ToolSpec {
                name: "final_answer".to_string(),
                description: None,
                input_schema: serde_json::json!({}),
                output_schema: None,
            })
            .unwrap();

        registry.retain_named(&["final_answer".to_string()]);

        assert!(!registry.contains("echo"));
        assert!(registry.contains("final_answer"));
    }

    #[tokio::test]
    async fn terminator_is_reported_distinctly() {
        let mut registry = ToolRegistry::new();
        registry
            .register_terminator(ToolSpec {
                name: "final_answer".to_string(),
                description: None,
                input_schema: serde_json::json!({}),
                output_schema: None,
            })
            .unwrap();
        assert!(registry.is_terminator("final_answer"));
    }
}
