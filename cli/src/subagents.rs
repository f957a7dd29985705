//! Registers named subagents from the config file as callable tools on the
//! root registry, each wired to its own model, system prompt, and tool set.

use std::path::PathBuf;
use std::sync::Arc;

use config::{ConfigFile, GenerationDefaults};
use cpe_core::subagent::{SubagentAsTool, SubagentConfig};
use cpe_core::tools::ToolRegistry;
use eventbus::EventBusClient;
use store::ConversationStore;

use crate::{build_generator, built_in_registry, CliError};

#[allow(clippy::too_many_arguments)]
pub fn register_subagents(
    registry: &mut ToolRegistry,
    file: &ConfigFile,
    working_folder: Arc<PathBuf>,
    store: Option<Arc<dyn ConversationStore>>,
    event_bus: Option<EventBusClient>,
    allow_shell: bool,
) -> Result<(), CliError> {
    for (name, entry) in &file.subagents {
        let model_entry = file.models.get(&entry.model).ok_or_else(|| {
            CliError::Usage(format!("subagent {name} names unknown model {}", entry.model))
        })?;
        let (model, credential) = config::resolve_model(model_entry, &entry.model, None)?;
        let generator = build_generator(&model, &credential)?;

        let system_prompt = match &entry.system_prompt_path {
            Some(p) => std::fs::read_to_string(p)?,
            None => String::new(),
        };
        let output_schema = match &entry.output_schema_path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                Some(serde_json::from_str(&content).map_err(|e| {
                    CliError::Usage(format!("subagent {name} output schema is invalid json: {e}"))
                })?)
            }
            None => None,
        };

        let allowed_tools = entry.allowed_tools.clone();
        let wf = working_folder.clone();
        let registry_factory: Arc<dyn Fn() -> ToolRegistry + Send + Sync> = Arc::new(move || {
            let mut r = built_in_registry(wf.clone(), allow_shell);
            if let Some(allowed) = &allowed_tools {
                r.retain_named(allowed);
            }
            r
        });

        let config = SubagentConfig {
            name: name.clone(),
            description: entry.description.clone(),
            system_prompt,
            generation_defaults: GenerationDefaults::default(),
            output_schema,
        };

        let tool = SubagentAsTool::new(config, generator, registry_factory, store.clone(), event_bus.clone());
        registry.register(Arc::new(tool))?;
    }
    Ok(())
}
