pub mod artifact;
pub mod llm;
pub mod manager;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use llm::{LlamaCppLoader, PromptFormat};
pub use manager::{ModelManager, ModelState};
