//! Model token limit specification.

use serde::{Deserialize, Serialize};

/// Model token limit specification.
///
/// Used by the generation pipeline to decide request sizing; context
/// compression is out of scope for this workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Context (input) token limit.
    pub context_limit: u32,
    /// Output token limit.
    pub output_limit: u32,
    /// Optional cache read token limit (e.g. for models with prompt caching).
    #[serde(default)]
    pub cache_read: Option<u32>,
    /// Optional cache write token limit.
    #[serde(default)]
    pub cache_write: Option<u32>,
}

impl ModelSpec {
    pub fn new(context_limit: u32, output_limit: u32) -> Self {
        Self {
            context_limit,
            output_limit,
            cache_read: None,
            cache_write: None,
        }
    }

    pub fn with_cache_read(mut self, limit: u32) -> Self {
        self.cache_read = Some(limit);
        self
    }

    pub fn with_cache_write(mut self, limit: u32) -> Self {
        self.cache_write = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_cache_fields() {
        let spec = ModelSpec::new(128_000, 4_096)
            .with_cache_read(100_000)
            .with_cache_write(50_000);
        assert_eq!(spec.context_limit, 128_000);
        assert_eq!(spec.cache_read, Some(100_000));
        assert_eq!(spec.cache_write, Some(50_000));
    }
}
