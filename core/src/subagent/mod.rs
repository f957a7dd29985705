//! Recursive pipeline invocation with a restricted tool set, a label that
//! files the sub-dialog under the parent's branch, and lifecycle events
//! posted to the inherited event bus.

use std::sync::Arc;

use async_trait::async_trait;
use eventbus::EventBusClient;
use serde_json::Value;
use store::{subagent_label, ConversationStore, Message};
use uuid::Uuid;

use config::GenerationDefaults;
use stream_event::SubagentEvent;

use crate::pipeline::{run_turn, EventContext, Generator, PipelineError};
use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolRegistry, ToolSourceError, ToolSpec};

#[derive(Debug, thiserror::Error)]
pub enum SubagentError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("subagent loop ended without calling final_answer")]
    NoFinalAnswer,
    #[error("failed to report subagent start: {0}")]
    StartEvent(#[from] eventbus::EventBusError),
}

/// Everything a subagent needs that the parent doesn't share with it: its
/// own model, system prompt, allowed tools, and optional structured
/// output contract.
pub struct SubagentConfig {
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub generation_defaults: GenerationDefaults,
    /// When set, a `final_answer` terminator tool is registered with this
    /// as its input schema, and the subagent must call it to finish.
    pub output_schema: Option<Value>,
}

const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Runs one subagent turn to completion. Returns the `final_answer`
/// parameters as JSON when `output_schema` was set, or `None` for a
/// free-form subagent that simply stops emitting tool calls.
#[allow(clippy::too_many_arguments)]
pub async fn run_subagent(
    config: &SubagentConfig,
    generator: &dyn Generator,
    mut registry: ToolRegistry,
    store: Option<&dyn ConversationStore>,
    event_bus: Option<&EventBusClient>,
    task: Message,
) -> Result<Option<Value>, SubagentError> {
    let run_id = Uuid::new_v4().to_string();
    let label = subagent_label(&config.name, &run_id);

    if let Some(bus) = event_bus {
        bus.post_start(&SubagentEvent::start(&config.name, &run_id)).await?;
    }

    if let Some(schema) = &config.output_schema {
        registry
            .register_terminator(ToolSpec {
                name: FINAL_ANSWER_TOOL.to_string(),
                description: Some("Return the final structured result and stop.".to_string()),
                input_schema: schema.clone(),
                output_schema: None,
            })
            .ok();
    }

    let event_ctx = event_bus.map(|bus| EventContext { bus, subagent_name: &config.name, run_id: &run_id });

    let mut printer = |_msg: &Message| {};
    let outcome = run_turn(
        generator,
        &registry,
        store,
        &config.system_prompt,
        &[],
        task,
        None,
        &label,
        &config.generation_defaults,
        None,
        None,
        event_ctx.as_ref(),
        &mut printer,
    )
    .await;

    let result = match outcome {
        Ok(outcome) => match (&config.output_schema, outcome.terminator_call) {
            (Some(_), Some((_, params))) => Ok(Some(params)),
            (Some(_), None) => Err(SubagentError::NoFinalAnswer),
            (None, _) => Ok(None),
        },
        Err(e) => Err(SubagentError::Pipeline(e)),
    };

    if let Some(bus) = event_bus {
        let _ = bus.post(&SubagentEvent::end(&config.name, &run_id, None)).await;
    }

    result
}

/// Exposes a subagent to a parent's tool registry: calling this tool runs
/// the whole recursive pipeline and returns its structured result as text.
pub struct SubagentAsTool {
    config: SubagentConfig,
    generator: Arc<dyn Generator>,
    registry_factory: Arc<dyn Fn() -> ToolRegistry + Send + Sync>,
    store: Option<Arc<dyn ConversationStore>>,
    event_bus: Option<EventBusClient>,
}

impl SubagentAsTool {
    pub fn new(
        config: SubagentConfig,
        generator: Arc<dyn Generator>,
        registry_factory: Arc<dyn Fn() -> ToolRegistry + Send + Sync>,
        store: Option<Arc<dyn ConversationStore>>,
        event_bus: Option<EventBusClient>,
    ) -> Self {
        Self { config, generator, registry_factory, store, event_bus }
    }
}

#[async_trait]
impl Tool for SubagentAsTool {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "task": { "type": "string" } },
                "required": ["task"]
            }),
            output_schema: self.config.output_schema.clone(),
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let task_text = args
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing task".to_string()))?;
        let task = Message::user(task_text);
        let registry = (self.registry_factory)();

        let result = run_subagent(
            &self.config,
            self.generator.as_ref(),
            registry,
            self.store.as_deref(),
            self.event_bus.as_ref(),
            task,
        )
        .await
        .map_err(|e| ToolSourceError::Transport(e.to_string()))?;

        let text = match result {
            Some(value) => serde_json::to_string(&value).unwrap_or_default(),
            None => String::new(),
        };
        Ok(ToolCallContent { text })
    }
}
