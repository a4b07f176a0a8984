pub mod config;
pub mod error;
pub mod interfaces;
pub mod lifecycle;

pub use config::{AppConfig, GenerationConfig, ModelConfig, ServerConfig};
pub use error::{EngineError, EngineResult};
pub use interfaces::{EngineLoader, SamplingParams, TextEngine};
