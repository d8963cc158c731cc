//! Admin endpoints: registration, label migration, and deletion
//!
//! Every request body carries the admin key from the server config;
//! a mismatch is rejected before the engine is touched. Registration
//! and deletion exist for the coordinating lab only, so the key check
//! here is the whole authorization story.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use anno_common::model::{Block, Lab};
use anno_common::Error;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    #[serde(rename = "admin-key")]
    pub admin_key: String,
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    #[serde(rename = "lab-name")]
    pub lab_name: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct MigrateBlockRequest {
    #[serde(rename = "admin-key")]
    pub admin_key: String,
    pub block: Block,
}

#[derive(Debug, Deserialize)]
pub struct DeleteInstanceRequest {
    #[serde(rename = "admin-key")]
    pub admin_key: String,
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    pub username: String,
    pub id: String,
    pub instance: usize,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    #[serde(rename = "admin-key")]
    pub admin_key: String,
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteLabRequest {
    #[serde(rename = "admin-key")]
    pub admin_key: String,
    #[serde(rename = "lab-key")]
    pub lab_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ListLabsRequest {
    #[serde(rename = "admin-key")]
    pub admin_key: String,
}

fn require_admin(state: &AppState, key: &str) -> Result<(), ApiError> {
    if !state.config.key_is_admin(key) {
        return Err(ApiError(Error::Unauthorized));
    }
    Ok(())
}

/// POST /api/admin/user - register a user, creating the lab on first
/// sight. `added` is false when the user already existed.
pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &req.admin_key)?;
    let added = state
        .engine
        .register_user(&req.lab_key, &req.lab_name, &req.username)
        .await?;
    Ok(Json(json!({ "added": added })))
}

/// POST /api/admin/block - resubmit a labeled block, used when a
/// database format change requires old labels to be replayed.
pub async fn migrate_block(
    State(state): State<AppState>,
    Json(req): Json<MigrateBlockRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &req.admin_key)?;
    let instance = state.engine.submit_block(req.block).await?;
    Ok(Json(json!({ "instance": instance })))
}

/// POST /api/admin/labs - every registered lab.
pub async fn list_labs(
    State(state): State<AppState>,
    Json(req): Json<ListLabsRequest>,
) -> Result<Json<Vec<Lab>>, ApiError> {
    require_admin(&state, &req.admin_key)?;
    let labs = state.engine.labs().await?;
    Ok(Json(labs))
}

/// POST /api/admin/delete/instance - delete one submission.
pub async fn delete_instance(
    State(state): State<AppState>,
    Json(req): Json<DeleteInstanceRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &req.admin_key)?;
    let group_deleted = state
        .engine
        .delete_instance(&req.lab_key, &req.username, &req.id, req.instance)
        .await?;
    Ok(Json(json!({ "group-deleted": group_deleted })))
}

/// POST /api/admin/delete/user - delete every submission of one user and
/// clear their finished-work history.
pub async fn delete_user(
    State(state): State<AppState>,
    Json(req): Json<DeleteUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &req.admin_key)?;
    state.engine.delete_user_instances(&req.lab_key, &req.username).await?;
    Ok(Json(json!({ "deleted": req.username })))
}

/// POST /api/admin/delete/lab - delete every submission of one lab and
/// clear every member's finished-work history.
pub async fn delete_lab(
    State(state): State<AppState>,
    Json(req): Json<DeleteLabRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &req.admin_key)?;
    state.engine.delete_lab_instances(&req.lab_key).await?;
    Ok(Json(json!({ "deleted": req.lab_key })))
}
