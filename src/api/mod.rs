//! API module
//!
//! HTTP request handlers and the router that wires them together.

pub mod generate;
pub mod settings;
pub mod streaming;

use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// `GET /api/health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Article pipeline is healthy".to_string(),
    })
}

/// Application routes without middleware
pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route(
            "/api/config",
            get(settings::get_config).post(settings::update_config),
        )
        .route("/api/generate", post(generate::generate))
        .with_state(state)
}
