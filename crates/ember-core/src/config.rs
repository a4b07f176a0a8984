use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::interfaces::SamplingParams;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings used to load the GGUF model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Hugging Face repo to fetch from when `path` does not exist.
    #[serde(default)]
    pub hf_repo: Option<String>,
    /// File inside `hf_repo`. Defaults to the file name of `path`.
    #[serde(default)]
    pub hf_file: Option<String>,
    /// Hub cache directory. Unset uses the `hf-hub` default.
    #[serde(default)]
    pub hf_cache_dir: Option<PathBuf>,
    /// Context window; 0 takes the model's trained size.
    #[serde(default = "default_n_ctx")]
    pub n_ctx: u32,
    /// Worker threads. Unset means every available core.
    #[serde(default)]
    pub n_threads: Option<u32>,
    #[serde(default = "default_n_batch")]
    pub n_batch: u32,
    /// Layers offloaded to the GPU (0 = CPU only).
    #[serde(default)]
    pub n_gpu_layers: u32,
    /// `raw` or `chatml`.
    #[serde(default = "default_prompt_format")]
    pub prompt_format: String,
    /// Forward llama.cpp's own log output.
    #[serde(default)]
    pub verbose: bool,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/qwen1.5-1.8b-q4.gguf")
}
fn default_n_ctx() -> u32 {
    2048
}
fn default_n_batch() -> u32 {
    512
}
fn default_prompt_format() -> String {
    "raw".into()
}

const FALLBACK_THREADS: u32 = 4;

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            hf_repo: None,
            hf_file: None,
            hf_cache_dir: None,
            n_ctx: default_n_ctx(),
            n_threads: None,
            n_batch: default_n_batch(),
            n_gpu_layers: 0,
            prompt_format: default_prompt_format(),
            verbose: false,
        }
    }
}

impl ModelConfig {
    /// Resolved worker-thread count: explicit setting, else all cores.
    pub fn threads(&self) -> u32 {
        match self.n_threads {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(FALLBACK_THREADS),
        }
    }
}

/// Fixed sampling parameters applied to every request.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
    #[serde(default = "default_seed")]
    pub seed: u32,
    #[serde(default = "default_max_new_tokens")]
    pub default_max_new_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_stop() -> Vec<String> {
    vec!["<|endoftext|>".into(), "</s>".into(), "<|im_end|>".into()]
}
fn default_seed() -> u32 {
    42
}
fn default_max_new_tokens() -> u32 {
    256
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            stop: default_stop(),
            seed: default_seed(),
            default_max_new_tokens: default_max_new_tokens(),
        }
    }
}

impl GenerationConfig {
    pub fn sampling(&self, max_tokens: u32) -> SamplingParams {
        SamplingParams {
            max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: self.stop.clone(),
            seed: self.seed,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback chain:
    /// explicit path → ./config/default.toml → hardcoded defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {e}", path.display());
                }
            }
        }

        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            match Self::load(default_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load default config: {e}");
                }
            }
        }

        tracing::info!("Using hardcoded default configuration");
        Self::default()
    }
}
