//! HTTP request handlers

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use ember_ai::{ModelManager, ModelState};

use super::error::ApiError;
use super::extract::ValidJson;
use super::schemas::{
    GenerateRequest, GenerateResponse, HealthResponse, MAX_NEW_TOKENS, MIN_NEW_TOKENS,
};

pub const ENGINE_NAME: &str = "llama.cpp";

/// Shared application state
pub struct AppState {
    pub manager: Arc<ModelManager>,
}

impl AppState {
    pub fn new(manager: Arc<ModelManager>) -> Self {
        Self { manager }
    }
}

/// Health check endpoint. Always 200; readiness is in the body.
///
/// Both readiness fields come from one state snapshot so they cannot disagree.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_state = state.manager.state();
    Json(HealthResponse {
        status: "ok".into(),
        model_loaded: model_state == ModelState::Loaded,
        state: model_state.label().into(),
        engine: ENGINE_NAME.into(),
    })
}

/// Text generation endpoint.
///
/// Never waits on a model load: an unloaded engine answers 503 at once.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if !state.manager.is_loaded() {
        return Err(ApiError::Unavailable);
    }

    // Range already enforced by validation.
    let max_new_tokens = match request.max_new_tokens {
        Some(n) => n as u32,
        None => state
            .manager
            .generation_config()
            .default_max_new_tokens
            .clamp(MIN_NEW_TOKENS as u32, MAX_NEW_TOKENS as u32),
    };

    match state.manager.generate(&request.prompt, max_new_tokens).await {
        Ok(text) => Ok(Json(GenerateResponse { text })),
        Err(e) => {
            tracing::error!("Generation failed: {e}");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}
