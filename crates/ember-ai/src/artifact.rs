//! Locating the GGUF file a model is loaded from.

use std::path::{Path, PathBuf};

use ember_core::config::ModelConfig;
use ember_core::error::{EngineError, EngineResult};
use hf_hub::api::sync::ApiBuilder;

/// Resolve the model file: the local `path` if it exists, otherwise the
/// configured Hugging Face repo (cache first, then download). Blocking.
pub fn resolve(config: &ModelConfig) -> EngineResult<PathBuf> {
    if config.path.is_file() {
        return Ok(config.path.clone());
    }

    let Some(repo) = config.hf_repo.as_deref() else {
        return Err(EngineError::ArtifactNotFound(config.path.clone()));
    };
    // Without an explicit hub filename, fetch the file `path` points at.
    let file = match &config.hf_file {
        Some(file) => file.clone(),
        None => match config.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Err(EngineError::ArtifactNotFound(config.path.clone())),
        },
    };

    fetch_from_hub(repo, &file, config.hf_cache_dir.as_deref())
}

fn fetch_from_hub(repo: &str, file: &str, cache_dir: Option<&Path>) -> EngineResult<PathBuf> {
    let fetch_error = |reason: String| EngineError::ArtifactFetch {
        repo: repo.to_string(),
        file: file.to_string(),
        reason,
    };

    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.to_path_buf());
    }
    let api = builder.build().map_err(|e| fetch_error(e.to_string()))?;

    tracing::info!("Fetching {file} from Hugging Face repo {repo}");
    api.model(repo.to_string())
        .get(file)
        .map_err(|e| fetch_error(e.to_string()))
}
