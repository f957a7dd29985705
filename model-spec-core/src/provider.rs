//! Provider identity and capability table.

use serde::{Deserialize, Serialize};

/// LLM provider this model talks to.
///
/// `Other` carries a free-form name so config files can reference providers
/// this workspace doesn't special-case (the provider driver itself is
/// treated as opaque per the generation pipeline contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    Anthropic,
    OpenAiCompatible,
    Other(String),
}

impl Provider {
    /// Env var name this provider's API key is expected in, e.g. `OPENAI_API_KEY`.
    pub fn api_key_env_var(&self) -> String {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY".to_string(),
            Provider::Anthropic => "ANTHROPIC_API_KEY".to_string(),
            Provider::OpenAiCompatible => "OPENAI_API_KEY".to_string(),
            Provider::Other(name) => format!("{}_API_KEY", name.to_uppercase()),
        }
    }

    /// Capability table entry for this provider.
    pub fn capabilities(&self) -> ProviderCapabilities {
        match self {
            Provider::OpenAi => ProviderCapabilities { supports_oauth: true },
            Provider::Anthropic => ProviderCapabilities { supports_oauth: true },
            Provider::OpenAiCompatible => ProviderCapabilities { supports_oauth: false },
            Provider::Other(_) => ProviderCapabilities { supports_oauth: false },
        }
    }
}

/// Per-provider capabilities relevant to config validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub supports_oauth: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_env_var_matches_provider() {
        assert_eq!(Provider::OpenAi.api_key_env_var(), "OPENAI_API_KEY");
        assert_eq!(Provider::Anthropic.api_key_env_var(), "ANTHROPIC_API_KEY");
        assert_eq!(Provider::Other("mistral".into()).api_key_env_var(), "MISTRAL_API_KEY");
    }

    #[test]
    fn openai_compatible_does_not_support_oauth() {
        assert!(!Provider::OpenAiCompatible.capabilities().supports_oauth);
    }
}
