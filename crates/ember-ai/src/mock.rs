//! Substitute engine and loader for testing without model weights.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ember_core::config::ModelConfig;
use ember_core::interfaces::{EngineLoader, SamplingParams, TextEngine};

#[derive(Debug, Clone)]
enum Behavior {
    /// Echo the prompt back, one whitespace-separated word per token.
    Echo,
    Fixed(String),
    Failing(String),
}

/// Shared record of the last call made to a `MockEngine`.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    last: Arc<Mutex<Option<(String, SamplingParams)>>>,
}

impl CallRecorder {
    pub fn last(&self) -> Option<(String, SamplingParams)> {
        self.last.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct MockEngine {
    behavior: Behavior,
    recorder: CallRecorder,
}

impl MockEngine {
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fixed(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Failing(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            recorder: CallRecorder::default(),
        }
    }

    pub fn recorder(&self) -> CallRecorder {
        self.recorder.clone()
    }
}

impl TextEngine for MockEngine {
    fn generate(&self, prompt: &str, params: &SamplingParams) -> anyhow::Result<String> {
        *self.recorder.last.lock().unwrap() = Some((prompt.to_string(), params.clone()));

        match &self.behavior {
            Behavior::Echo => Ok(prompt
                .split_whitespace()
                .take(params.max_tokens as usize)
                .collect::<Vec<_>>()
                .join(" ")),
            Behavior::Fixed(text) => Ok(text.clone()),
            Behavior::Failing(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

/// Hands out clones of one `MockEngine` and counts how often it was asked to.
pub struct MockLoader {
    engine: MockEngine,
    loads: AtomicUsize,
    fail_first: usize,
    delay: Option<Duration>,
}

impl MockLoader {
    pub fn new(engine: MockEngine) -> Self {
        Self {
            engine,
            loads: AtomicUsize::new(0),
            fail_first: 0,
            delay: None,
        }
    }

    /// Fail the first `n` load attempts.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Sleep this long inside each load, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EngineLoader for MockLoader {
    fn load(&self, _config: &ModelConfig) -> anyhow::Result<Box<dyn TextEngine>> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if attempt < self.fail_first {
            anyhow::bail!("mock load failure (attempt {})", attempt + 1);
        }
        Ok(Box::new(self.engine.clone()))
    }
}
