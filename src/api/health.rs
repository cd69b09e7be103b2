use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::config::CacheBackend;

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Readiness plus a summary of what the service is wired to.
pub async fn ready(State(state): State<AppState>) -> Json<Value> {
    let cache_backend = match state.config.cache_backend {
        CacheBackend::Sqlite => "sqlite",
        CacheBackend::Memory => "memory",
    };
    Json(json!({
        "status": "ready",
        "walletConnected": state.session.is_connected().await,
        "cacheBackend": cache_backend,
        "portfolioGeneration": state.aggregator.view().await.generation,
    }))
}
