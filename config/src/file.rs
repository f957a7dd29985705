//! On-disk config file schema (YAML or JSON; same shape).

use std::collections::HashMap;
use std::path::PathBuf;

use model_spec_core::Provider;
use serde::{Deserialize, Serialize};

use crate::code_mode::CodeMode;
use crate::credentials::CredentialRef;
use crate::generation::GenerationDefaults;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub models: HashMap<String, ModelEntry>,
    #[serde(default, rename = "mcpServers")]
    pub mcp_servers: HashMap<String, McpServerEntry>,
    #[serde(default)]
    pub subagents: HashMap<String, SubagentEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default, rename = "generationParams")]
    pub generation_params: GenerationDefaults,
    #[serde(default, rename = "codeMode")]
    pub code_mode: Option<CodeMode>,
    #[serde(default, rename = "conversationStoragePath")]
    pub conversation_storage_path: Option<PathBuf>,
    #[serde(default, rename = "timeoutSeconds")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelEntry {
    pub provider: Provider,
    #[serde(rename = "modelId")]
    pub model_id: String,
    #[serde(default, rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub credential: Option<CredentialRef>,
    #[serde(rename = "contextLimit")]
    pub context_limit: u32,
    #[serde(rename = "outputLimit")]
    pub output_limit: u32,
    #[serde(default, rename = "cacheRead")]
    pub cache_read: Option<u32>,
    #[serde(default, rename = "cacheWrite")]
    pub cache_write: Option<u32>,
    #[serde(default, rename = "generationDefaults")]
    pub generation_defaults: GenerationDefaults,
    #[serde(default, rename = "systemPromptPath")]
    pub system_prompt_path: Option<PathBuf>,
    #[serde(default, rename = "codeMode")]
    pub code_mode: Option<CodeMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum McpTransportKind {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpServerEntry {
    pub transport: McpTransportKind,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "timeoutSeconds")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, rename = "enabledTools")]
    pub enabled_tools: Option<Vec<String>>,
    #[serde(default, rename = "disabledTools")]
    pub disabled_tools: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubagentEntry {
    pub model: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "systemPromptPath")]
    pub system_prompt_path: Option<PathBuf>,
    #[serde(default, rename = "outputSchemaPath")]
    pub output_schema_path: Option<PathBuf>,
    #[serde(default, rename = "allowedTools")]
    pub allowed_tools: Option<Vec<String>>,
}

/// Parses a config file's contents, trying YAML first (a superset of JSON
/// for our purposes) then falling back to strict JSON.
pub fn parse(content: &str) -> Result<ConfigFile, String> {
    match serde_yaml::from_str(content) {
        Ok(parsed) => Ok(parsed),
        Err(yaml_err) => serde_json::from_str(content)
            .map_err(|json_err| format!("yaml: {yaml_err}; json: {json_err}")),
    }
}
