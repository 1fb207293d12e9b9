//! Health endpoint

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health - liveness plus last fatal pipeline error
async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime_seconds = (Utc::now() - state.startup_time).num_seconds();
    let last_error = state.last_error.read().await.clone();

    Json(json!({
        "status": "ok",
        "module": "fotoflow-pp",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime_seconds,
        "last_error": last_error,
    }))
}
