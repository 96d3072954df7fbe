//! Minimal HTTP surface: a health endpoint for orchestration probes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::domain::service::AuthorService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthorService>,
    pub service_name: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Liveness plus a storage round trip.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.service.list_authors(0, 1).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "service": state.service_name })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": state.service_name,
                "error": e.to_string(),
            })),
        ),
    }
}
