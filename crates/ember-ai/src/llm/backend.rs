use std::num::NonZeroU32;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::{Context, Result};
use ember_core::config::ModelConfig;
use ember_core::interfaces::{EngineLoader, SamplingParams, TextEngine};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel};
use llama_cpp_2::sampling::LlamaSampler;

use super::stop::truncate_at_stop;

/// Global llama.cpp backend, initialized once, never freed until process exit.
/// llama_backend_init() is a global operation; calling it twice or freeing it
/// while models are live causes crashes.
static LLAMA_BACKEND: OnceLock<LlamaBackend> = OnceLock::new();

/// Callers must not race on first initialization; `ModelManager` serializes loads.
fn get_or_init_backend(verbose: bool) -> Result<&'static LlamaBackend> {
    if let Some(backend) = LLAMA_BACKEND.get() {
        return Ok(backend);
    }
    let mut backend = LlamaBackend::init().context("Failed to init llama backend")?;
    if !verbose {
        backend.void_logs();
    }
    Ok(LLAMA_BACKEND.get_or_init(|| backend))
}

/// Synchronous llama.cpp backend. Wraps model + cached context.
///
/// Field order matters: Rust drops fields in declaration order.
/// `ctx` must drop before `model`.
pub struct LlamaCppBackend {
    // SAFETY: `ctx` borrows `model` via a transmuted `'static` lifetime.
    // This is sound because `ctx` is declared first, so it drops before `model`.
    ctx: LlamaContext<'static>,
    model: LlamaModel,
    n_ctx: u32,
    n_batch: u32,
}

// SAFETY: LlamaCppBackend is only accessed through the Mutex in LlamaCppEngine,
// ensuring exclusive access. The underlying llama_context raw pointer is safe
// to move between threads when not accessed concurrently.
unsafe impl Send for LlamaCppBackend {}

impl LlamaCppBackend {
    /// Load a GGUF model file and create the context once, so the KV cache
    /// is allocated a single time for the life of the process.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let backend = get_or_init_backend(config.verbose)?;

        let model_params = LlamaModelParams::default().with_n_gpu_layers(config.n_gpu_layers);

        let model = LlamaModel::load_from_file(backend, &config.path, &model_params)
            .map_err(|e| anyhow::anyhow!("Failed to load model: {:?}", e))?;

        let threads = config.threads() as i32;
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(config.n_ctx))
            .with_n_batch(config.n_batch)
            .with_n_threads(threads)
            .with_n_threads_batch(threads);

        let ctx = model
            .new_context(backend, ctx_params)
            .map_err(|e| anyhow::anyhow!("Failed to create context: {:?}", e))?;

        // SAFETY: `ctx` borrows `model`, but both live in this struct.
        // `ctx` is declared before `model`, so Rust drops it first, so the borrow is always valid.
        let ctx: LlamaContext<'static> = unsafe { std::mem::transmute(ctx) };

        // n_ctx = 0 asks llama.cpp for the trained size; keep what it chose.
        let n_ctx = ctx.n_ctx();

        tracing::debug!(
            n_ctx,
            n_batch = config.n_batch,
            threads,
            "llama.cpp context created"
        );

        Ok(Self {
            ctx,
            model,
            n_ctx,
            n_batch: config.n_batch.max(1),
        })
    }

    /// Generate text from a prompt. Reuses the cached context (clears KV cache between calls).
    /// Not suitable for direct async use; wrap with spawn_blocking.
    pub fn generate(&mut self, prompt: &str, params: &SamplingParams) -> Result<String> {
        self.ctx.clear_kv_cache();

        let tokens_list = self
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {:?}", e))?;

        let n_prompt = tokens_list.len() as u32;
        if n_prompt >= self.n_ctx {
            anyhow::bail!(
                "Requested tokens ({n_prompt}) exceed context window of {}",
                self.n_ctx
            );
        }
        let max_tokens = params.max_tokens.min(self.n_ctx - n_prompt);

        // Prompt is fed in n_batch-sized chunks; logits only for the final token.
        let chunk_len = self.n_batch as usize;
        let mut batch = LlamaBatch::new(chunk_len, 1);
        let last_index = tokens_list.len() as i32 - 1;
        for (chunk_idx, chunk) in tokens_list.chunks(chunk_len).enumerate() {
            batch.clear();
            let offset = (chunk_idx * chunk_len) as i32;
            for (i, &token) in (offset..).zip(chunk) {
                batch
                    .add(token, i, &[0], i == last_index)
                    .map_err(|e| anyhow::anyhow!("Batch add failed: {:?}", e))?;
            }
            self.ctx
                .decode(&mut batch)
                .map_err(|e| anyhow::anyhow!("Initial decode failed: {:?}", e))?;
        }

        let mut sampler = LlamaSampler::chain_simple([
            LlamaSampler::temp(params.temperature),
            LlamaSampler::top_p(params.top_p, 1),
            LlamaSampler::dist(params.seed),
        ]);

        let mut decoder = encoding_rs::UTF_8.new_decoder();
        let mut output = String::new();
        let mut n_cur = n_prompt as i32;

        for _ in 0..max_tokens {
            let token = sampler.sample(&self.ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if self.model.is_eog_token(token) {
                break;
            }

            match self.model.token_to_piece(token, &mut decoder, true, None) {
                Ok(piece) => output.push_str(&piece),
                Err(e) => {
                    tracing::debug!("Skipping undecodable token {}: {:?}", token.0, e);
                    continue;
                }
            }

            let (kept, hit) = truncate_at_stop(&output, &params.stop);
            if hit {
                let keep = kept.len();
                output.truncate(keep);
                break;
            }

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| anyhow::anyhow!("Batch add failed: {:?}", e))?;
            n_cur += 1;

            self.ctx
                .decode(&mut batch)
                .map_err(|e| anyhow::anyhow!("Decode failed: {:?}", e))?;
        }

        Ok(output)
    }
}

/// `TextEngine` over a single cached context; one generation runs at a time.
pub struct LlamaCppEngine {
    inner: Mutex<LlamaCppBackend>,
}

impl LlamaCppEngine {
    pub fn new(backend: LlamaCppBackend) -> Self {
        Self {
            inner: Mutex::new(backend),
        }
    }
}

impl TextEngine for LlamaCppEngine {
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        let mut backend = lock_recovering(&self.inner);
        backend.generate(prompt, params)
    }
}

/// A panic mid-generation leaves no state that outlives the call, since
/// `generate` clears the KV cache before every prompt; keep serving.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Loads GGUF models through llama.cpp.
#[derive(Debug, Default, Clone, Copy)]
pub struct LlamaCppLoader;

impl EngineLoader for LlamaCppLoader {
    fn load(&self, config: &ModelConfig) -> Result<Box<dyn TextEngine>> {
        let backend = LlamaCppBackend::load(config)?;
        Ok(Box::new(LlamaCppEngine::new(backend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_lock_is_recovered() {
        let mutex = std::sync::Arc::new(Mutex::new(7u32));
        let poisoner = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("generation panicked");
        })
        .join();
        assert!(mutex.is_poisoned());

        let mut guard = lock_recovering(&mutex);
        *guard += 1;
        assert_eq!(*guard, 8);
    }
}
