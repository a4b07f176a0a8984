use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model file not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Failed to fetch {file} from {repo}: {reason}")]
    ArtifactFetch {
        repo: String,
        file: String,
        reason: String,
    },

    #[error("Engine initialization failed: {0}")]
    InitFailed(String),

    #[error("Model not loaded")]
    NotLoaded,

    #[error("Generation failed: {0}")]
    Generation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
