//! Contracts between the lifecycle manager and the inference engine.
//!
//! Both traits are blocking; callers on an async runtime dispatch them
//! to the blocking pool.

use crate::config::ModelConfig;

/// Sampling settings for a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Output is cut at the earliest occurrence of any of these.
    pub stop: Vec<String>,
    pub seed: u32,
}

/// A loaded model that can turn a prompt into text.
pub trait TextEngine: Send + Sync {
    fn generate(&self, prompt: &str, params: &SamplingParams) -> anyhow::Result<String>;
}

/// Builds a `TextEngine` from model configuration. Expensive: file I/O and
/// large allocations happen here.
pub trait EngineLoader: Send + Sync {
    fn load(&self, config: &ModelConfig) -> anyhow::Result<Box<dyn TextEngine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl TextEngine for Echo {
        fn generate(&self, prompt: &str, params: &SamplingParams) -> anyhow::Result<String> {
            Ok(prompt.chars().take(params.max_tokens as usize).collect())
        }
    }

    #[test]
    fn engine_is_object_safe_and_shareable() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TextEngine>();
        assert_send_sync::<dyn EngineLoader>();

        let engine: Box<dyn TextEngine> = Box::new(Echo);
        let params = SamplingParams {
            max_tokens: 3,
            temperature: 0.7,
            top_p: 0.9,
            stop: Vec::new(),
            seed: 42,
        };
        assert_eq!(engine.generate("hello", &params).unwrap(), "hel");
    }
}
