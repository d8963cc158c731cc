//! Lab info queries

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use anno_common::model::Lab;

use crate::api::ApiError;
use crate::AppState;

/// GET /api/lab/:key - lab metadata and per-user bookkeeping.
pub async fn lab_info(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Lab>, ApiError> {
    let lab = state.engine.lab(&key).await?;
    Ok(Json(lab))
}

/// GET /api/lab/:key/completed - item IDs finished by anyone in the lab.
/// Two users sharing an item both contribute it.
pub async fn completed(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ids = state.engine.completed_item_ids(&key).await?;
    Ok(Json(json!({ "ids": ids })))
}

/// GET /api/lab/:key/completed/training
pub async fn completed_training(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ids = state.engine.completed_training_ids(&key).await?;
    Ok(Json(json!({ "ids": ids })))
}

/// GET /api/lab/:key/completed/reliability
pub async fn completed_reliability(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ids = state.engine.completed_reliability_ids(&key).await?;
    Ok(Json(json!({ "ids": ids })))
}
