//! Generation parameter overrides and the three-layer merge.

use serde::{Deserialize, Serialize};

/// Generation-time sampling/shape parameters. Every field is optional so
/// layers can be merged by "last non-nil wins".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDefaults {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    #[serde(default)]
    pub number_of_responses: Option<u32>,
    #[serde(default)]
    pub thinking_budget: Option<u32>,
}

impl GenerationDefaults {
    /// Overlays `other` onto `self`, field by field, keeping `self`'s value
    /// wherever `other`'s is `None` ("last non-nil wins").
    pub fn overlay(mut self, other: &GenerationDefaults) -> Self {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(temperature);
        take!(max_tokens);
        take!(top_p);
        take!(top_k);
        take!(frequency_penalty);
        take!(presence_penalty);
        take!(number_of_responses);
        take!(thinking_budget);
        self
    }

    /// Merges global defaults, model defaults, and CLI overrides in that
    /// order, CLI last so it wins.
    pub fn merge_layers(
        global: &GenerationDefaults,
        model: &GenerationDefaults,
        cli: &GenerationDefaults,
    ) -> GenerationDefaults {
        global.clone().overlay(model).overlay(cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rightmost_non_nil_wins_per_field() {
        let global = GenerationDefaults {
            temperature: Some(0.2),
            max_tokens: Some(1024),
            ..Default::default()
        };
        let model = GenerationDefaults {
            max_tokens: Some(2048),
            top_p: Some(0.9),
            ..Default::default()
        };
        let cli = GenerationDefaults {
            temperature: Some(0.7),
            ..Default::default()
        };
        let merged = GenerationDefaults::merge_layers(&global, &model, &cli);
        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.max_tokens, Some(2048));
        assert_eq!(merged.top_p, Some(0.9));
        assert_eq!(merged.top_k, None);
    }

    #[test]
    fn all_nil_overrides_leave_lower_layers_untouched() {
        let global = GenerationDefaults {
            temperature: Some(0.5),
            ..Default::default()
        };
        let merged = GenerationDefaults::merge_layers(&global, &GenerationDefaults::default(), &GenerationDefaults::default());
        assert_eq!(merged.temperature, Some(0.5));
    }
}
