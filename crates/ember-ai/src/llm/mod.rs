pub mod backend;
pub mod format;
pub mod stop;

pub use backend::{LlamaCppBackend, LlamaCppEngine, LlamaCppLoader};
pub use format::PromptFormat;
