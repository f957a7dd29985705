//! Subcommand implementations. Each module owns one top-level subcommand
//! group named in the CLI surface (`root`, `conversation`, `model`, `mcp`,
//! `config`, `auth`).

pub mod auth;
pub mod config_cmd;
pub mod conversation;
pub mod mcp;
pub mod model;
pub mod root;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use config::{resolve, ConfigFile, EffectiveConfig, GenerationDefaults, McpServerConfig, RuntimeOptions};

use crate::CliError;

/// Generation-parameter override flags shared by every command that
/// resolves an `EffectiveConfig`.
#[derive(Args, Debug, Clone, Default)]
pub struct GenArgs {
    /// Config file path; defaults to `./cpe.yaml` or `./cpe.yml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Model reference to use, as named in the config file.
    #[arg(long, value_name = "REF")]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f64>,
    #[arg(long = "max-tokens")]
    pub max_tokens: Option<u32>,
    #[arg(long = "top-p")]
    pub top_p: Option<f64>,
    #[arg(long = "top-k")]
    pub top_k: Option<u32>,
    #[arg(long = "frequency-penalty")]
    pub frequency_penalty: Option<f64>,
    #[arg(long = "presence-penalty")]
    pub presence_penalty: Option<f64>,
    #[arg(long = "number-of-responses")]
    pub number_of_responses: Option<u32>,
    #[arg(long = "thinking-budget")]
    pub thinking_budget: Option<u32>,

    /// Per-turn timeout, e.g. `30s`, `2m`.
    #[arg(long)]
    pub timeout: Option<String>,

    /// Run without persisting anything to the conversation store.
    #[arg(long)]
    pub incognito: bool,

    /// Register the `bash` tool, letting the model run arbitrary shell
    /// commands in the working folder. Off by default.
    #[arg(long = "allow-shell")]
    pub allow_shell: bool,
}

impl GenArgs {
    fn generation_overrides(&self) -> GenerationDefaults {
        GenerationDefaults {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            number_of_responses: self.number_of_responses,
            thinking_budget: self.thinking_budget,
        }
    }
}

/// Finds the config file to read: the explicit `--config` path, or
/// `./cpe.yaml`/`./cpe.yml` in the current directory, or the XDG config
/// dir's `cpe/cpe.yaml` equivalent.
pub fn find_config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    for candidate in ["./cpe.yaml", "./cpe.yml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Ok(p);
        }
    }
    if let Some(dir) = dirs::config_dir() {
        let p = dir.join("cpe").join("cpe.yaml");
        if p.exists() {
            return Ok(p);
        }
    }
    Err(CliError::Usage(
        "no config file found: pass --config or create ./cpe.yaml".to_string(),
    ))
}

/// Reads and resolves the `EffectiveConfig` for one invocation.
pub fn load_effective_config(gen_args: &GenArgs) -> Result<EffectiveConfig, CliError> {
    let path = find_config_path(gen_args.config.as_deref())?;
    let content = std::fs::read_to_string(&path)?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let opts = RuntimeOptions {
        model_ref: gen_args.model.clone(),
        timeout_override: gen_args.timeout.clone(),
        generation_overrides: gen_args.generation_overrides(),
        base_url_override: None,
        incognito: gen_args.incognito,
    };
    Ok(resolve(&content, &path.to_string_lossy(), &dir, &opts)?)
}

/// Reads the raw config file content and its directory, without resolving
/// a model (used by commands that need the whole file, e.g. `model list`).
pub fn read_config_file(explicit: Option<&Path>) -> Result<(String, PathBuf), CliError> {
    let path = find_config_path(explicit)?;
    let content = std::fs::read_to_string(&path)?;
    Ok((content, path))
}

/// Resolves the conversation store path from the config file's defaults,
/// without requiring a selected model. Mirrors `config::resolve`'s own
/// storage-path logic.
pub fn storage_path(file: &ConfigFile, config_dir: &Path) -> Result<PathBuf, CliError> {
    let raw = file
        .defaults
        .conversation_storage_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("./.cpeconvo"));
    let expanded = config::expand_tilde(&raw)?;
    Ok(if expanded.is_absolute() { expanded } else { config_dir.join(expanded) })
}

/// Resolves every configured MCP server from the config file, without
/// requiring a selected model. Mirrors `config::resolve`'s own per-server
/// validation (conflicting tool filters are rejected the same way).
pub fn mcp_servers_from_file(file: &ConfigFile) -> Result<Vec<McpServerConfig>, CliError> {
    let mut servers = Vec::with_capacity(file.mcp_servers.len());
    for (name, mcp) in &file.mcp_servers {
        if mcp.enabled_tools.is_some() && mcp.disabled_tools.is_some() {
            return Err(CliError::Resolve(config::ResolveError::ConflictingToolFilters {
                server: name.clone(),
            }));
        }
        servers.push(McpServerConfig {
            name: name.clone(),
            transport: mcp.transport,
            command: mcp.command.clone(),
            args: mcp.args.clone(),
            url: mcp.url.clone(),
            timeout: Duration::from_secs(mcp.timeout_seconds.unwrap_or(60)),
            enabled_tools: mcp.enabled_tools.clone(),
            disabled_tools: mcp.disabled_tools.clone(),
        });
    }
    Ok(servers)
}
