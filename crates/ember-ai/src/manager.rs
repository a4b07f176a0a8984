//! Model lifecycle: one engine per process, loaded at most once.
//!
//! State moves `NotLoaded → Loading → Loaded`, or `Loading → Failed` when the
//! artifact is missing or the engine refuses to initialize. A failed load is
//! retried from scratch on the next `load()` call. Once loaded, the engine is
//! never replaced. The artifact comes from `ModelConfig.path`, or from the
//! Hugging Face Hub when the file is absent and `hf_repo` is set.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use ember_core::config::{GenerationConfig, ModelConfig};
use ember_core::error::{EngineError, EngineResult};
use ember_core::interfaces::{EngineLoader, TextEngine};
use tokio::sync::Mutex;

use crate::artifact;
use crate::llm::PromptFormat;

/// Observable lifecycle state, safe to report to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

impl ModelState {
    /// Short machine-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

enum Slot {
    NotLoaded,
    Loading,
    Loaded(Arc<dyn TextEngine>),
    Failed(String),
}

pub struct ModelManager {
    shared: Arc<Shared>,
}

struct Shared {
    model: ModelConfig,
    generation: GenerationConfig,
    format: PromptFormat,
    loader: Arc<dyn EngineLoader>,
    slot: RwLock<Slot>,
    // Held across the whole check-then-load sequence so concurrent first
    // callers never initialize the engine twice.
    load_gate: Mutex<()>,
}

impl ModelManager {
    pub fn new(
        model: ModelConfig,
        generation: GenerationConfig,
        loader: Arc<dyn EngineLoader>,
    ) -> Self {
        let format = PromptFormat::from_config(&model.prompt_format);
        Self {
            shared: Arc::new(Shared {
                model,
                generation,
                format,
                loader,
                slot: RwLock::new(Slot::NotLoaded),
                load_gate: Mutex::new(()),
            }),
        }
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.shared.model
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.shared.generation
    }

    /// Whether an engine handle is stored. Never waits on an in-flight load.
    pub fn is_loaded(&self) -> bool {
        self.shared.is_loaded()
    }

    pub fn state(&self) -> ModelState {
        match &*self.shared.read_slot() {
            Slot::NotLoaded => ModelState::NotLoaded,
            Slot::Loading => ModelState::Loading,
            Slot::Loaded(_) => ModelState::Loaded,
            Slot::Failed(reason) => ModelState::Failed(reason.clone()),
        }
    }

    /// Load the engine if it is not loaded yet. A no-op once loaded.
    ///
    /// The transition runs on its own task: dropping this future does not
    /// abandon a half-finished load, and later callers wait for it.
    pub async fn load(&self) -> EngineResult<()> {
        if self.shared.is_loaded() {
            return Ok(());
        }

        let shared = self.shared.clone();
        tokio::spawn(async move { shared.load().await })
            .await
            .map_err(|e| EngineError::InitFailed(e.to_string()))?
    }

    /// Generate a completion. Loads the engine first if no handle is stored,
    /// so a caller can succeed even when the startup load failed.
    pub async fn generate(&self, prompt: &str, max_new_tokens: u32) -> EngineResult<String> {
        let engine = match self.shared.engine() {
            Some(engine) => engine,
            None => {
                self.load().await?;
                self.shared.engine().ok_or(EngineError::NotLoaded)?
            }
        };

        let prompt = self.shared.format.apply(prompt);
        let params = self.shared.generation.sampling(max_new_tokens);

        let text = tokio::task::spawn_blocking(move || engine.generate(&prompt, &params))
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?
            .map_err(|e| EngineError::Generation(format!("{e:#}")))?;

        Ok(text.trim().to_string())
    }
}

impl Shared {
    fn is_loaded(&self) -> bool {
        matches!(*self.read_slot(), Slot::Loaded(_))
    }

    async fn load(&self) -> EngineResult<()> {
        let _gate = self.load_gate.lock().await;
        if self.is_loaded() {
            return Ok(());
        }

        self.set_slot(Slot::Loading);

        match self.load_engine().await {
            Ok(engine) => {
                self.set_slot(Slot::Loaded(engine));
                Ok(())
            }
            Err(e) => {
                self.set_slot(Slot::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn load_engine(&self) -> EngineResult<Arc<dyn TextEngine>> {
        let started = Instant::now();
        let loader = self.loader.clone();
        let config = self.model.clone();

        let (path, engine) = tokio::task::spawn_blocking(move || {
            let path = artifact::resolve(&config)?;
            tracing::info!(
                "Loading model {} (n_ctx={}, threads={}, n_batch={})",
                path.display(),
                config.n_ctx,
                config.threads(),
                config.n_batch
            );
            let resolved = ModelConfig {
                path: path.clone(),
                ..config
            };
            let engine = loader
                .load(&resolved)
                .map_err(|e| EngineError::InitFailed(format!("{e:#}")))?;
            Ok::<_, EngineError>((path, engine))
        })
        .await
        .map_err(|e| EngineError::InitFailed(e.to_string()))??;

        tracing::info!(
            "Model loaded from {} in {:.2}s",
            path.display(),
            started.elapsed().as_secs_f64()
        );
        Ok(Arc::from(engine))
    }

    fn engine(&self) -> Option<Arc<dyn TextEngine>> {
        match &*self.read_slot() {
            Slot::Loaded(engine) => Some(engine.clone()),
            _ => None,
        }
    }

    fn read_slot(&self) -> std::sync::RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_slot(&self, slot: Slot) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = slot;
    }
}
