//! `config add|remove`: edits the models section of the config file in
//! place. The external model registry that would normally supply limits
//! and credential shape for `<provider>/<model>` is out of scope here;
//! callers pass limits explicitly or accept sane placeholders.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use model_spec_core::Provider;

use crate::commands::read_config_file;
use crate::CliError;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCommand,

    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Add a model, named `<provider>/<model-id>`, to the config file.
    Add {
        provider_and_model: String,
        #[arg(long = "ref", value_name = "NAME")]
        model_ref: Option<String>,
        #[arg(long = "context-limit", default_value_t = 128_000)]
        context_limit: u32,
        #[arg(long = "output-limit", default_value_t = 4096)]
        output_limit: u32,
    },
    /// Remove a model reference from the config file.
    Remove { r#ref: String },
}

fn parse_provider(name: &str) -> Provider {
    match name {
        "openai" | "open_ai" => Provider::OpenAi,
        "anthropic" => Provider::Anthropic,
        "openai_compatible" | "openai-compatible" => Provider::OpenAiCompatible,
        other => Provider::Other(other.to_string()),
    }
}

pub async fn run(args: ConfigArgs) -> Result<(), CliError> {
    let (content, path) = read_config_file(args.config.as_deref())?;
    let mut file = config::parse_file(&content)
        .map_err(|e| config::ResolveError::MalformedConfig(path.display().to_string(), e))?;

    match args.cmd {
        ConfigCommand::Add { provider_and_model, model_ref, context_limit, output_limit } => {
            let (provider_name, model_id) = provider_and_model.split_once('/').ok_or_else(|| {
                CliError::Usage(format!("expected <provider>/<model>, got {provider_and_model}"))
            })?;
            let provider = parse_provider(provider_name);
            let reference = model_ref.unwrap_or_else(|| model_id.to_string());
            let entry = config::ModelEntry {
                provider,
                model_id: model_id.to_string(),
                base_url: None,
                credential: None,
                context_limit,
                output_limit,
                cache_read: None,
                cache_write: None,
                generation_defaults: config::GenerationDefaults::default(),
                system_prompt_path: None,
                code_mode: None,
            };
            file.models.insert(reference.clone(), entry);
            println!("added model {reference}");
        }
        ConfigCommand::Remove { r#ref } => {
            if file.models.remove(&r#ref).is_none() {
                return Err(CliError::Usage(format!("unknown model reference: {}", r#ref)));
            }
            println!("removed model {}", r#ref);
        }
    }

    let serialized = serde_yaml::to_string(&file)
        .map_err(|e| CliError::Usage(format!("failed to serialize config: {e}")))?;
    std::fs::write(&path, serialized)?;
    Ok(())
}
