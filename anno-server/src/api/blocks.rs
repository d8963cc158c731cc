//! Block checkout, submission, release, and group queries

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use anno_common::model::{Block, BlockGroup, PassKind, WorkItem};

use crate::api::ApiError;
use crate::engine::Engine;
use crate::AppState;

/// Request asking for one block to code.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    pub username: String,
}

/// Request returning a held item, completed or abandoned.
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    pub username: String,
    pub id: String,
}

/// Request completing a held item under a given pass kind.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    pub username: String,
    pub id: String,
    pub kind: PassKind,
}

#[derive(Debug, Deserialize)]
pub struct GroupBatchRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LabBlocksRequest {
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoderBlocksRequest {
    pub coder: String,
    pub ids: Vec<String>,
}

/// POST /api/block/checkout
///
/// Select a free work item, activate it, and record the checkout. The
/// response carries the block path so the caller can fetch the clip
/// archive.
pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<WorkItem>, ApiError> {
    let item = state
        .engine
        .select_and_assign(&req.lab_key, &req.username, Engine::accept_all)
        .await?;
    Ok(Json(item))
}

/// POST /api/block/submit
///
/// Accept a labeled block. Responds with the instance number the label
/// store assigned within the item's group.
pub async fn submit(
    State(state): State<AppState>,
    Json(block): Json<Block>,
) -> Result<Json<Value>, ApiError> {
    let instance = state.engine.submit_block(block).await?;
    Ok(Json(json!({ "instance": instance })))
}

/// POST /api/block/release - abandon a checkout without finishing it.
pub async fn release(
    State(state): State<AppState>,
    Json(req): Json<ItemRequest>,
) -> Result<Json<Value>, ApiError> {
    state.engine.release(&req.id, &req.lab_key, &req.username).await?;
    Ok(Json(json!({ "released": req.id })))
}

/// POST /api/block/complete - finish a held item without a submission
/// payload (the labels may follow via the submit path).
pub async fn complete(
    State(state): State<AppState>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .engine
        .complete(&req.id, &req.lab_key, &req.username, req.kind)
        .await?;
    Ok(Json(json!({ "completed": req.id })))
}

/// GET /api/group/:item_id
pub async fn get_group(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<BlockGroup>, ApiError> {
    let group = state.engine.group(&item_id).await?;
    Ok(Json(group))
}

/// POST /api/groups - batch fetch, all-or-nothing.
pub async fn get_groups(
    State(state): State<AppState>,
    Json(req): Json<GroupBatchRequest>,
) -> Result<Json<Vec<BlockGroup>>, ApiError> {
    let groups = state.engine.groups(&req.ids).await?;
    Ok(Json(groups))
}

/// POST /api/blocks/lab - blocks one lab submitted across the items.
pub async fn lab_blocks(
    State(state): State<AppState>,
    Json(req): Json<LabBlocksRequest>,
) -> Result<Json<Vec<Block>>, ApiError> {
    let blocks = state.engine.lab_blocks(&req.lab_key, &req.ids).await?;
    Ok(Json(blocks))
}

/// POST /api/blocks/coder - blocks one coder submitted across the items.
pub async fn coder_blocks(
    State(state): State<AppState>,
    Json(req): Json<CoderBlocksRequest>,
) -> Result<Json<Vec<Block>>, ApiError> {
    let blocks = state.engine.user_blocks(&req.coder, &req.ids).await?;
    Ok(Json(blocks))
}
