//! Ember: a CPU-first llama.cpp text-generation service.
//!
//! The model is loaded once at boot (in the background, so the listener is
//! up immediately) and a single `POST /generate` endpoint drives it.
//! `GET /health` reports whether the model is ready.

pub mod cli;
pub mod server;

pub use server::{build_router, start, AppState};
