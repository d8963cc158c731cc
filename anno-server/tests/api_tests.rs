//! Integration tests for the HTTP layer
//!
//! Drive the router with `tower::ServiceExt::oneshot` over an in-memory
//! store and check status code mapping per error kind.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use anno_common::config::ServerConfig;
use anno_common::model::WorkItem;
use anno_server::{build_router, manifest, AppState, Engine, Store};

const ADMIN_KEY: &str = "secret";

async fn setup_app(items: &[(&str, u32)], users: &[(&str, &str, &str)]) -> axum::Router {
    let store = Store::open_in_memory().await.unwrap();
    let catalog: Vec<WorkItem> = items
        .iter()
        .map(|(file, index)| WorkItem::new(*file, *index, format!("blocks/{}/{}.zip", file, index)))
        .collect();
    manifest::sync_catalog(&store, &catalog).await.unwrap();

    let engine = Engine::load(store).await.unwrap();
    for (lab_key, lab_name, username) in users {
        engine.register_user(lab_key, lab_name, username).await.unwrap();
    }

    let config = ServerConfig {
        admin_key: ADMIN_KEY.to_string(),
        db_path: PathBuf::from("unused"),
        manifest_path: PathBuf::from("unused"),
        bind_addr: "127.0.0.1:0".to_string(),
    };
    build_router(AppState::new(Arc::new(engine), config))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn submit_body(item_id: &str, lab_key: &str, coder: &str, kind: &str) -> Value {
    let (file, index) = item_id.split_once(":::").unwrap();
    json!({
        "id": item_id,
        "clan-file": file,
        "block-index": index.parse::<u32>().unwrap(),
        "lab-key": lab_key,
        "lab-name": format!("{} lab", lab_key),
        "coder": coder,
        "kind": kind,
        "clips": [{
            "clip-index": 0,
            "clip-tier": "FAN",
            "classification": "ids"
        }]
    })
}

#[tokio::test]
async fn health_endpoint_reports_module() {
    let app = setup_app(&[], &[]).await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "anno-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn checkout_hands_out_each_item_once() {
    let app = setup_app(&[("fileA", 3)], &[("L1", "Seattle", "alice")]).await;

    let request = post("/api/block/checkout", json!({"lab-key": "L1", "username": "alice"}));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["id"], "fileA:::3");
    assert_eq!(body["block-path"], "blocks/fileA/3.zip");
    assert_eq!(body["active"], true);

    // Pool exhausted.
    let request = post("/api/block/checkout", json!({"lab-key": "L1", "username": "alice"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_assigns_instances_and_enforces_the_cap() {
    let app = setup_app(
        &[("fileB", 1)],
        &[("L1", "Seattle", "alice"), ("L1", "Seattle", "bob"), ("L1", "Seattle", "carol")],
    )
    .await;

    let response = app
        .clone()
        .oneshot(post("/api/block/submit", submit_body("fileB:::1", "L1", "alice", "regular")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["instance"], 0);

    let response = app
        .clone()
        .oneshot(post("/api/block/submit", submit_body("fileB:::1", "L1", "bob", "regular")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post("/api/block/submit", submit_body("fileB:::1", "L1", "carol", "regular")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.oneshot(get("/api/group/fileB:::1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["blocks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn release_of_unheld_item_maps_to_conflict() {
    let app = setup_app(&[("fileA", 3)], &[("L1", "Seattle", "alice")]).await;
    let request = post(
        "/api/block/release",
        json!({"lab-key": "L1", "username": "alice", "id": "fileA:::3"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn group_fetch_for_unlabeled_item_is_not_found() {
    let app = setup_app(&[("fileA", 3)], &[("L1", "Seattle", "alice")]).await;
    let response = app.oneshot(get("/api/group/fileA:::3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lab_completed_lists_are_exposed() {
    let app = setup_app(&[("fileD", 0)], &[("L1", "Seattle", "alice")]).await;

    let response = app
        .clone()
        .oneshot(post("/api/block/submit", submit_body("fileD:::0", "L1", "alice", "training")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/lab/L1/completed/training")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ids"], json!(["fileD:::0"]));

    let response = app.oneshot(get("/api/lab/L9/completed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_endpoints_require_the_admin_key() {
    let app = setup_app(&[], &[]).await;

    let request = post(
        "/api/admin/user",
        json!({"admin-key": "guess", "lab-key": "L1", "lab-name": "Seattle", "username": "alice"}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = post(
        "/api/admin/user",
        json!({"admin-key": ADMIN_KEY, "lab-key": "L1", "lab-name": "Seattle", "username": "alice"}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["added"], true);

    // Re-registering the same user is a no-op, not an error.
    let request = post(
        "/api/admin/user",
        json!({"admin-key": ADMIN_KEY, "lab-key": "L1", "lab-name": "Seattle", "username": "alice"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["added"], false);
}

#[tokio::test]
async fn admin_lab_delete_clears_history_over_http() {
    let app = setup_app(&[("fileB", 1)], &[("L1", "Seattle", "alice"), ("L1", "Seattle", "bob")]).await;

    for coder in ["alice", "bob"] {
        let response = app
            .clone()
            .oneshot(post("/api/block/submit", submit_body("fileB:::1", "L1", coder, "regular")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let request = post("/api/admin/delete/lab", json!({"admin-key": ADMIN_KEY, "lab-key": "L1"}));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/group/fileB:::1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/lab/L1")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["users"]["alice"]["finished-work-items"], json!([]));
    assert_eq!(body["users"]["bob"]["finished-work-items"], json!([]));
}
