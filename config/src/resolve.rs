//! `EffectiveConfig` resolution: the three-layer merge (global defaults,
//! model defaults, CLI overrides) that produces the single record the rest
//! of the system consumes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use model_spec_core::{Model, ModelSpec};

use crate::code_mode::{validate_local_module_paths, CodeMode};
use crate::credentials::CredentialRef;
use crate::file::{self, ConfigFile, McpTransportKind, ModelEntry};
use crate::generation::GenerationDefaults;
use crate::ResolveError;

/// One configured MCP server, post-resolution.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: McpTransportKind,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub url: Option<String>,
    pub timeout: Duration,
    pub enabled_tools: Option<Vec<String>>,
    pub disabled_tools: Option<Vec<String>>,
}

/// A subagent's static configuration, resolved down to its own model and
/// tool restrictions.
#[derive(Debug, Clone)]
pub struct SubagentSpec {
    pub name: String,
    pub description: Option<String>,
    pub model_ref: String,
    pub system_prompt_path: Option<PathBuf>,
    pub output_schema: Option<serde_json::Value>,
    pub allowed_tools: Option<Vec<String>>,
}

/// Caller-supplied overrides, distinguished from "unset" by `Option::None`
/// at every field so the merge can tell a deliberate zero from silence.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub model_ref: Option<String>,
    pub timeout_override: Option<String>,
    pub generation_overrides: GenerationDefaults,
    pub base_url_override: Option<String>,
    pub incognito: bool,
}

/// The fully resolved, read-only record consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub model: Model,
    pub credential: CredentialRef,
    pub system_prompt_path: Option<PathBuf>,
    pub generation_defaults: GenerationDefaults,
    pub timeout: Duration,
    pub mcp_servers: Vec<McpServerConfig>,
    pub conversation_storage_path: PathBuf,
    pub code_mode: Option<CodeMode>,
    pub subagent: Option<SubagentSpec>,
    pub incognito: bool,
}

/// Expands a leading `~` or `~/...` to the user's home directory. Any other
/// tilde form (`~foo/...`) is rejected, since resolving another user's home
/// directory is out of scope.
pub fn expand_tilde(path: &Path) -> Result<PathBuf, ResolveError> {
    let s = path.to_string_lossy();
    if !s.starts_with('~') {
        return Ok(path.to_path_buf());
    }
    if s == "~" || s.starts_with("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| ResolveError::UnsupportedTilde(s.to_string()))?;
        return Ok(if s == "~" {
            home
        } else {
            home.join(&s[2..])
        });
    }
    Err(ResolveError::UnsupportedTilde(s.to_string()))
}

fn parse_timeout(s: &str) -> Result<Duration, ResolveError> {
    let s = s.trim();
    let (num, unit) = s.split_at(
        s.find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len()),
    );
    let value: f64 = num
        .parse()
        .map_err(|_| ResolveError::InvalidTimeout(s.to_string()))?;
    let seconds = match unit {
        "" | "s" => value,
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        _ => return Err(ResolveError::InvalidTimeout(s.to_string())),
    };
    Ok(Duration::from_secs_f64(seconds))
}

/// Builds a `Model` and its `CredentialRef` from one config-file model
/// entry, validating that the credential kind the entry names is one its
/// provider actually supports. Shared by `resolve` and by callers (e.g. the
/// CLI's subagent wiring) that need a model outside the main three-layer
/// merge.
pub fn resolve_model(
    entry: &ModelEntry,
    model_ref: &str,
    base_url_override: Option<&str>,
) -> Result<(Model, CredentialRef), ResolveError> {
    let credential = entry
        .credential
        .clone()
        .unwrap_or(CredentialRef::ApiKey { env_var: None });
    credential.validate_for(&entry.provider, model_ref)?;

    let mut spec = ModelSpec::new(entry.context_limit, entry.output_limit);
    if let Some(r) = entry.cache_read {
        spec = spec.with_cache_read(r);
    }
    if let Some(w) = entry.cache_write {
        spec = spec.with_cache_write(w);
    }
    let mut model = Model::new(model_ref.to_string(), entry.provider.clone(), entry.model_id.clone(), spec);
    if let Some(base_url) = base_url_override.map(str::to_string).or_else(|| entry.base_url.clone()) {
        model = model.with_base_url(base_url);
    }
    Ok((model, credential))
}

/// Resolves an `EffectiveConfig` from a config file's contents plus runtime
/// overrides. `config_dir` is the directory the config file lives in
/// (paths are resolved relative to it); `config_path` is used only for
/// error messages.
pub fn resolve(
    content: &str,
    config_path: &str,
    config_dir: &Path,
    opts: &RuntimeOptions,
) -> Result<EffectiveConfig, ResolveError> {
    let file: ConfigFile = file::parse(content)
        .map_err(|e| ResolveError::MalformedConfig(config_path.to_string(), e))?;

    let model_ref = opts
        .model_ref
        .clone()
        .ok_or_else(|| ResolveError::UnknownModel(String::new()))?;
    let entry = file
        .models
        .get(&model_ref)
        .ok_or_else(|| ResolveError::UnknownModel(model_ref.clone()))?;
    let (model, credential) = resolve_model(entry, &model_ref, opts.base_url_override.as_deref())?;

    let generation_defaults = GenerationDefaults::merge_layers(
        &file.defaults.generation_params,
        &entry.generation_defaults,
        &opts.generation_overrides,
    );

    let timeout_secs = file.defaults.timeout_seconds.unwrap_or(60);
    let timeout = match &opts.timeout_override {
        Some(s) => parse_timeout(s)?,
        None => Duration::from_secs(timeout_secs),
    };

    let storage_raw = file
        .defaults
        .conversation_storage_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("./.cpeconvo"));
    let storage_expanded = expand_tilde(&storage_raw)?;
    let conversation_storage_path = if storage_expanded.is_absolute() {
        storage_expanded
    } else {
        config_dir.join(storage_expanded)
    };

    // Every canonical path claimed by the config so far, so a
    // `localModulePaths` entry resolving to the same place as
    // `conversationStoragePath` (or another module path) is rejected.
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();
    seen_paths.insert(
        conversation_storage_path
            .canonicalize()
            .unwrap_or_else(|_| conversation_storage_path.clone()),
    );

    // CodeMode: model-level block replaces the default wholesale.
    let raw_code_mode = entry.code_mode.clone().or_else(|| file.defaults.code_mode.clone());
    let code_mode = match raw_code_mode {
        Some(mut cm) => {
            cm.local_module_paths =
                validate_local_module_paths(&cm.local_module_paths, config_dir, &mut seen_paths)?;
            Some(cm)
        }
        None => None,
    };

    let mut mcp_servers = Vec::with_capacity(file.mcp_servers.len());
    for (name, mcp) in &file.mcp_servers {
        if mcp.enabled_tools.is_some() && mcp.disabled_tools.is_some() {
            return Err(ResolveError::ConflictingToolFilters { server: name.clone() });
        }
        mcp_servers.push(McpServerConfig {
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

    Ok(EffectiveConfig {
        model,
        credential,
        system_prompt_path: entry.system_prompt_path.clone(),
        generation_defaults,
        timeout,
        mcp_servers,
        conversation_storage_path,
        code_mode,
        subagent: None,
        incognito: opts.incognito,
    })
}

/// Resolves a named subagent's spec from the parsed config file.
pub fn resolve_subagent(
    file_content: &str,
    config_path: &str,
    name: &str,
) -> Result<SubagentSpec, ResolveError> {
    let file: ConfigFile = file::parse(file_content)
        .map_err(|e| ResolveError::MalformedConfig(config_path.to_string(), e))?;
    let entry = file
        .subagents
        .get(name)
        .ok_or_else(|| ResolveError::UnknownModel(name.to_string()))?;
    let output_schema = match &entry.output_schema_path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ResolveError::BadSchemaPath {
                subagent: name.to_string(),
                path: p.display().to_string(),
            })?;
            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|_| ResolveError::BadSchemaPath {
                    subagent: name.to_string(),
                    path: p.display().to_string(),
                })?;
            Some(value)
        }
        None => None,
    };
    Ok(SubagentSpec {
        name: name.to_string(),
        description: entry.description.clone(),
        model_ref: entry.model.clone(),
        system_prompt_path: entry.system_prompt_path.clone(),
        output_schema,
        allowed_tools: entry.allowed_tools.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
defaults:
  generationParams:
    temperature: 0.2
  conversationStoragePath: "./.cpeconvo"
models:
  gpt-default:
    provider: open_ai
    modelId: gpt-4o
    contextLimit: 128000
    outputLimit: 4096
    generationDefaults:
      maxTokens: 2048
"#;

    #[test]
    fn resolves_model_and_merges_generation_params() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RuntimeOptions {
            model_ref: Some("gpt-default".to_string()),
            ..Default::default()
        };
        let cfg = resolve(SAMPLE, "cpe.yaml", dir.path(), &opts).unwrap();
        assert_eq!(cfg.model.model_id, "gpt-4o");
        assert_eq!(cfg.generation_defaults.temperature, Some(0.2));
        assert_eq!(cfg.generation_defaults.max_tokens, Some(2048));
    }

    #[test]
    fn cli_override_wins_over_model_and_global() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RuntimeOptions {
            model_ref: Some("gpt-default".to_string()),
            generation_overrides: GenerationDefaults {
                temperature: Some(0.9),
                ..Default::default()
            },
            ..Default::default()
        };
        let cfg = resolve(SAMPLE, "cpe.yaml", dir.path(), &opts).unwrap();
        assert_eq!(cfg.generation_defaults.temperature, Some(0.9));
    }

    #[test]
    fn unknown_model_ref_errors() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RuntimeOptions {
            model_ref: Some("nonexistent".to_string()),
            ..Default::default()
        };
        let err = resolve(SAMPLE, "cpe.yaml", dir.path(), &opts).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownModel(_)));
    }

    #[test]
    fn tilde_only_form_expands_to_home() {
        let expanded = expand_tilde(Path::new("~/work")).unwrap();
        assert!(expanded.ends_with("work"));
    }

    #[test]
    fn other_user_tilde_form_is_rejected() {
        let err = expand_tilde(Path::new("~bob/work")).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedTilde(_)));
    }

    #[test]
    fn invalid_timeout_string_errors() {
        let err = parse_timeout("not-a-duration").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidTimeout(_)));
    }

    #[test]
    fn timeout_suffix_forms_parse() {
        assert_eq!(parse_timeout("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn local_module_path_colliding_with_storage_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(crate::code_mode::MODULE_MARKER_FILE), "").unwrap();
        let content = format!(
            r#"
defaults:
  conversationStoragePath: "{storage}"
models:
  gpt-default:
    provider: open_ai
    modelId: gpt-4o
    contextLimit: 128000
    outputLimit: 4096
    codeMode:
      localModulePaths: ["{storage}"]
"#,
            storage = dir.path().display()
        );
        let opts = RuntimeOptions {
            model_ref: Some("gpt-default".to_string()),
            ..Default::default()
        };
        let err = resolve(&content, "cpe.yaml", dir.path(), &opts).unwrap_err();
        assert!(matches!(err, ResolveError::DuplicatePath(_)));
    }
}
