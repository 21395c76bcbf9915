//! Built-in handlers: liveness probe and service descriptor.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Map, Value};
use tokio::sync::watch;

use crate::health::{self, SERVICE_NAME};
use crate::lifecycle::Phase;

/// Static metadata advertised by the service descriptor.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    /// Every routable path, already prefixed.
    pub paths: Vec<String>,
}

/// State shared by the built-in handlers.
#[derive(Clone)]
pub struct AppState {
    pub phase: watch::Receiver<Phase>,
    pub info: Arc<ServiceInfo>,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let phase = *state.phase.borrow();
    match health::liveness(phase) {
        Some(status) => (StatusCode::OK, Json(json!(status))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "service": SERVICE_NAME,
                "phase": phase,
            })),
        ),
    }
}

/// `GET {prefix}/openapi.json`
pub async fn openapi_document(State(state): State<AppState>) -> Json<Value> {
    Json(descriptor(&state.info))
}

/// Minimal OpenAPI-shaped document listing the mounted routes.
pub fn descriptor(info: &ServiceInfo) -> Value {
    let paths: Map<String, Value> = info
        .paths
        .iter()
        .map(|path| {
            let summary = if path == "/health" {
                "Liveness probe"
            } else {
                "Inventory API"
            };
            (path.clone(), json!({ "get": { "summary": summary } }))
        })
        .collect();

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": info.title,
            "description": info.description,
            "version": info.version,
        },
        "paths": paths,
    })
}
