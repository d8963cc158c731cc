//! anno-server library - annotation work distribution service
//!
//! Hands out conversation blocks to lab coders, stores their submitted
//! labels with per-item pass caps, and keeps the per-user bookkeeping
//! consistent through deletions. The engine owns all of that; this crate
//! root only wires it to an axum router.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use anno_common::config::ServerConfig;

pub mod api;
pub mod engine;
pub mod manifest;
pub mod store;

pub use engine::Engine;
pub use store::Store;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, config: ServerConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let blocks = Router::new()
        .route("/api/block/checkout", post(api::blocks::checkout))
        .route("/api/block/submit", post(api::blocks::submit))
        .route("/api/block/release", post(api::blocks::release))
        .route("/api/block/complete", post(api::blocks::complete))
        .route("/api/group/:item_id", get(api::blocks::get_group))
        .route("/api/groups", post(api::blocks::get_groups))
        .route("/api/blocks/lab", post(api::blocks::lab_blocks))
        .route("/api/blocks/coder", post(api::blocks::coder_blocks));

    let labs = Router::new()
        .route("/api/lab/:key", get(api::labs::lab_info))
        .route("/api/lab/:key/completed", get(api::labs::completed))
        .route("/api/lab/:key/completed/training", get(api::labs::completed_training))
        .route(
            "/api/lab/:key/completed/reliability",
            get(api::labs::completed_reliability),
        );

    // Admin routes carry the admin key in the body; the handlers check it
    let admin = Router::new()
        .route("/api/admin/user", post(api::admin::register_user))
        .route("/api/admin/block", post(api::admin::migrate_block))
        .route("/api/admin/labs", post(api::admin::list_labs))
        .route("/api/admin/delete/instance", post(api::admin::delete_instance))
        .route("/api/admin/delete/user", post(api::admin::delete_user))
        .route("/api/admin/delete/lab", post(api::admin::delete_lab));

    Router::new()
        .merge(blocks)
        .merge(labs)
        .merge(admin)
        .merge(api::health::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}
