//! Shared provider/model identity and token-limit types.
//!
//! Kept dependency-free (serde only) so both `config` and `core` can depend
//! on it without pulling in HTTP clients or async runtimes.

mod provider;
mod spec;

pub use provider::{Provider, ProviderCapabilities};
pub use spec::ModelSpec;

use serde::{Deserialize, Serialize};

/// A single configured model: which provider it talks to, the model id that
/// provider expects, and its resolved token limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Name this model is referenced by in config (e.g. `"gpt-default"`).
    pub reference: String,
    pub provider: Provider,
    /// Provider-specific model id (e.g. `"gpt-4o"`).
    pub model_id: String,
    /// Base URL override; `None` means the provider's default.
    #[serde(default)]
    pub base_url: Option<String>,
    pub spec: ModelSpec,
}

impl Model {
    pub fn new(reference: impl Into<String>, provider: Provider, model_id: impl Into<String>, spec: ModelSpec) -> Self {
        Self {
            reference: reference.into(),
            provider,
            model_id: model_id.into(),
            base_url: None,
            spec,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}
