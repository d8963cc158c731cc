//! Health endpoint (no auth)

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "anno-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
