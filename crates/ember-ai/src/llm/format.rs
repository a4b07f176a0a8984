//! Prompt wrapping applied before text reaches the engine.

/// Supported prompt formats, selectable via `ModelConfig.prompt_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptFormat {
    /// Prompt is sent verbatim.
    #[default]
    Raw,
    /// Qwen chat models, `<|im_start|>user\n...<|im_end|>`
    ChatML,
}

impl PromptFormat {
    /// Parse from config string. Returns `Raw` for unknown values.
    pub fn from_config(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "chatml" | "qwen" => Self::ChatML,
            "raw" | "" => Self::Raw,
            other => {
                tracing::warn!("Unknown prompt format '{other}', sending prompts verbatim");
                Self::Raw
            }
        }
    }

    /// Wrap a single user message, ending with the assistant preamble.
    pub fn apply(&self, prompt: &str) -> String {
        match self {
            Self::Raw => prompt.to_string(),
            Self::ChatML => {
                format!("<|im_start|>user\n{prompt}<|im_end|>\n<|im_start|>assistant\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_passes_through() {
        assert_eq!(PromptFormat::Raw.apply("Hello"), "Hello");
    }

    #[test]
    fn chatml_single_turn() {
        let prompt = PromptFormat::ChatML.apply("Hello");
        assert!(prompt.starts_with("<|im_start|>user\nHello<|im_end|>"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn parse_config_values() {
        assert_eq!(PromptFormat::from_config("ChatML"), PromptFormat::ChatML);
        assert_eq!(PromptFormat::from_config("raw"), PromptFormat::Raw);
        assert_eq!(PromptFormat::from_config("mistral"), PromptFormat::Raw);
    }
}
