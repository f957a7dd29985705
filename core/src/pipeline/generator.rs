//! The provider-agnostic generation seam: one call in, one assistant
//! message (content, thinking, and tool-call blocks) out.

use async_trait::async_trait;
use config::GenerationDefaults;
use store::Message;

use crate::tools::ToolSpec;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("provider request failed: {0}")]
    Provider(String),
    #[error("provider returned no choices")]
    NoChoices,
}

/// One provider's concrete driver. A pipeline run holds exactly one
/// `Generator`, chosen for the model the dialog is running against.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        dialog: &[Message],
        system_prompt: &str,
        tools: &[ToolSpec],
        opts: &GenerationDefaults,
    ) -> Result<Message, GenerateError>;
}
