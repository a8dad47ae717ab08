//! Static model registry.
//!
//! Maps the human-readable model labels shown in a picker to wire-level
//! model ids and provider identifiers.

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Label shown to the user, e.g. "OpenAI: GPT-4o-mini".
    pub label: &'static str,
    /// Model id sent to the completion endpoint.
    pub id: &'static str,
    /// Provider identifier stamped onto messages.
    pub provider: &'static str,
}

static MODELS: Lazy<Vec<ModelSpec>> = Lazy::new(|| {
    vec![
        ModelSpec {
            label: "OpenAI: GPT-4o-mini",
            id: "gpt-4o-mini",
            provider: "openai",
        },
        ModelSpec {
            label: "OpenAI: GPT-4o",
            id: "gpt-4o",
            provider: "openai",
        },
        ModelSpec {
            label: "Anthropic: Claude 3.5 Sonnet",
            id: "claude-3-5-sonnet",
            provider: "anthropic",
        },
        ModelSpec {
            label: "Google: Gemini 1.5 Flash",
            id: "gemini-1.5-flash",
            provider: "google",
        },
        ModelSpec {
            label: "Meta: Llama 3.1 70B",
            id: "llama-3.1-70b",
            provider: "meta",
        },
    ]
});

/// All known models, in picker order.
pub fn models() -> &'static [ModelSpec] {
    &MODELS
}

/// Provider identifier for a model label.
///
/// Unknown labels resolve to `None`; callers stamping provenance fall back
/// to an empty string rather than failing.
pub fn provider_for(label: &str) -> Option<&'static str> {
    MODELS.iter().find(|m| m.label == label).map(|m| m.provider)
}

/// Wire-level model id for a model label.
pub fn model_id_for(label: &str) -> Option<&'static str> {
    MODELS.iter().find(|m| m.label == label).map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_label_resolves() {
        assert_eq!(provider_for("OpenAI: GPT-4o-mini"), Some("openai"));
        assert_eq!(model_id_for("OpenAI: GPT-4o-mini"), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_unknown_label_resolves_to_none() {
        assert_eq!(provider_for("Custom: Mystery Model"), None);
        assert_eq!(model_id_for("Custom: Mystery Model"), None);
    }

    #[test]
    fn test_labels_are_unique() {
        for (i, a) in models().iter().enumerate() {
            for b in &models()[i + 1..] {
                assert_ne!(a.label, b.label);
            }
        }
    }
}
