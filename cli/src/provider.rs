//! Builds a concrete [`Generator`](cpe_core::pipeline::Generator) for a
//! resolved model. Only the OpenAI-compatible wire format is wired up in
//! this build; other providers are named in config but have no driver yet.

use std::sync::Arc;

use config::CredentialRef;
use cpe_core::pipeline::{Generator, OpenAiGenerator};
use model_spec_core::{Model, Provider};

use crate::CliError;

pub fn build_generator(model: &Model, credential: &CredentialRef) -> Result<Arc<dyn Generator>, CliError> {
    match &model.provider {
        Provider::OpenAi | Provider::OpenAiCompatible => {
            let env_var = credential.env_var_for(&model.provider).ok_or_else(|| {
                CliError::Usage(format!("model {} has no api-key credential configured", model.reference))
            })?;
            let api_key = std::env::var(&env_var).map_err(|_| {
                CliError::Usage(format!("environment variable {env_var} is not set"))
            })?;
            Ok(Arc::new(OpenAiGenerator::new(
                model.model_id.clone(),
                &api_key,
                model.base_url.as_deref(),
            )))
        }
        other => Err(CliError::Usage(format!(
            "provider {other:?} has no generation driver wired into this build"
        ))),
    }
}
