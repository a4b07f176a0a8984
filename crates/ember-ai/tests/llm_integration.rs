//! Integration tests for llama.cpp inference. Real-model tests need GGUF files.
//! Run with: cargo test -p ember-ai -- --ignored

use std::path::PathBuf;
use std::sync::Arc;

use ember_ai::{LlamaCppLoader, ModelManager, ModelState};
use ember_core::config::{GenerationConfig, ModelConfig};
use ember_core::error::EngineError;

fn manager(path: PathBuf) -> ModelManager {
    let model = ModelConfig {
        path,
        ..ModelConfig::default()
    };
    ModelManager::new(model, GenerationConfig::default(), Arc::new(LlamaCppLoader))
}

/// Load the default deployment model and generate a short completion.
/// Requires: models/qwen1.5-1.8b-q4.gguf
#[tokio::test]
#[ignore = "Requires model files"]
async fn load_and_generate_default_model() {
    let manager = manager(ModelConfig::default().path);

    manager.load().await.expect("Failed to load model");
    assert!(manager.is_loaded());

    let response = manager
        .generate("Hello", 10)
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    println!("response: {response}");
}

/// `n_ctx = 0` takes the model's trained window instead of rejecting every prompt.
/// Requires: models/qwen1.5-1.8b-q4.gguf
#[tokio::test]
#[ignore = "Requires model files"]
async fn zero_context_uses_trained_window() {
    let model = ModelConfig {
        n_ctx: 0,
        ..ModelConfig::default()
    };
    let manager = ModelManager::new(model, GenerationConfig::default(), Arc::new(LlamaCppLoader));

    let response = manager
        .generate("Hello", 10)
        .await
        .expect("Generation should fit the trained window");
    assert!(!response.is_empty());
}

/// Loading a nonexistent model fails cleanly and leaves the manager retryable.
#[tokio::test]
async fn load_nonexistent_model_fails() {
    let manager = manager(PathBuf::from("/nonexistent/model.gguf"));

    let result = manager.load().await;
    assert!(matches!(result, Err(EngineError::ArtifactNotFound(_))));
    assert!(!manager.is_loaded());
    assert!(matches!(manager.state(), ModelState::Failed(_)));
}

/// A file that is not GGUF is rejected by the engine, not by the path check.
#[tokio::test]
#[ignore = "Links and initializes llama.cpp"]
async fn load_garbage_file_fails_in_engine() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"definitely not gguf").unwrap();
    let manager = manager(file.path().to_path_buf());

    let result = manager.load().await;
    assert!(matches!(result, Err(EngineError::InitFailed(_))));
    assert!(!manager.is_loaded());
}

/// Generating without a model file surfaces the missing artifact.
#[tokio::test]
async fn generate_without_model_fails() {
    let manager = manager(PathBuf::from("/nonexistent/model.gguf"));

    let result = manager.generate("hello", 10).await;
    assert!(result.is_err(), "Should fail when model file is missing");
}
