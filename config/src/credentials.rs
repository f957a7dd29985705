//! Credential reference type and provider-capability validation.
//!
//! Token storage and refresh are opaque per the resolver's contract; this
//! module only names which credential a model uses and rejects a pairing
//! the provider can't support (e.g. `oauth` against a provider with no
//! OAuth support).

use model_spec_core::Provider;
use serde::{Deserialize, Serialize};

use crate::ResolveError;

/// How a model's API credential is sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    /// Read from an environment variable; `None` means the provider's
    /// default (`Provider::api_key_env_var`).
    ApiKey {
        #[serde(default)]
        env_var: Option<String>,
    },
    /// Use the opaque OAuth credential store, keyed by provider name.
    OAuth,
}

impl CredentialRef {
    /// Validates that `provider` supports this credential kind.
    pub fn validate_for(&self, provider: &Provider, model_ref: &str) -> Result<(), ResolveError> {
        if matches!(self, CredentialRef::OAuth) && !provider.capabilities().supports_oauth {
            return Err(ResolveError::UnsupportedOauth {
                model: model_ref.to_string(),
                provider: format!("{provider:?}"),
            });
        }
        Ok(())
    }

    /// Resolves the env var an `ApiKey` credential reads from, falling back
    /// to the provider's default.
    pub fn env_var_for(&self, provider: &Provider) -> Option<String> {
        match self {
            CredentialRef::ApiKey { env_var } => {
                Some(env_var.clone().unwrap_or_else(|| provider.api_key_env_var()))
            }
            CredentialRef::OAuth => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_against_unsupported_provider_is_rejected() {
        let err = CredentialRef::OAuth
            .validate_for(&Provider::OpenAiCompatible, "local-model")
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedOauth { .. }));
    }

    #[test]
    fn oauth_against_supporting_provider_is_accepted() {
        CredentialRef::OAuth.validate_for(&Provider::OpenAi, "gpt").unwrap();
    }

    #[test]
    fn api_key_falls_back_to_provider_default_env_var() {
        let cred = CredentialRef::ApiKey { env_var: None };
        assert_eq!(cred.env_var_for(&Provider::Anthropic), Some("ANTHROPIC_API_KEY".to_string()));
    }
}
