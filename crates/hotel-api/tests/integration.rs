//! Integration tests: scoped list, CRUD with history, error codes, stats.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hotel_api::server::{self, AppState};
use hotel_service::HotelOps;
use hotel_store::{FaultyStore, InMemoryDirectory, InMemoryDocumentStore};
use hotel_types::{Role, User};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn user(id: &str, role: Role, hotels: &[&str]) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        display_name: Some(format!("User {}", id)),
        role,
        hotels: hotels.iter().map(|h| h.to_string()).collect(),
    }
}

fn test_app_with_store() -> (axum::Router, Arc<FaultyStore<InMemoryDocumentStore>>) {
    let store = Arc::new(FaultyStore::new(InMemoryDocumentStore::new()));
    let directory = Arc::new(InMemoryDirectory::with_users(vec![
        user("root", Role::SystemAdmin, &[]),
        user("ana", Role::Standard, &["H1", "H2"]),
        user("olga", Role::Standard, &["H9"]),
    ]));
    let ops = HotelOps::with_defaults(store.clone(), directory);
    let state = Arc::new(AppState { ops: Arc::new(ops) });
    (server::router(state), store)
}

fn test_app() -> axum::Router {
    test_app_with_store().0
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> Value {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn create(app: &axum::Router, actor: &str, data: Value) -> String {
    let j = post(app, "/api/incident/create", json!({"actor": actor, "data": data})).await;
    assert_eq!(j["code"], 200, "{}", j);
    j["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_ok() {
    let app = test_app();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn create_update_then_history_newest_first() {
    let app = test_app();
    let id = create(&app, "ana@example.com", json!({"hotelId": "H1", "title": "Leak"})).await;

    let j = post(
        &app,
        "/api/incident/update",
        json!({"actor": "ana", "id": id, "data": {"status": "resolved"}}),
    )
    .await;
    assert_eq!(j["code"], 200);
    assert!(j["data"]["history_id"].is_string());
    assert!(j.get("warning").is_none());

    let j = post(&app, "/api/incident/history", json!({"actor": "ana", "id": id})).await;
    let entries = j["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["header"]["operation"], "Updated");
    assert_eq!(entries[0]["header"]["actor"], "User ana");
    assert_eq!(entries[1]["header"]["operation"], "Created");
    let status = entries[0]["changes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["field"] == "status")
        .unwrap();
    assert_eq!(status["label"], "Status");
    assert_eq!(status["old"], "open");
    assert_eq!(status["new"], "resolved");
}

#[tokio::test]
async fn list_is_scoped_per_actor() {
    let app = test_app();
    create(&app, "root", json!({"hotelId": "H1"})).await;
    create(&app, "root", json!({"hotelId": "H2", "status": "resolved"})).await;
    create(&app, "root", json!({"hotelId": "H9"})).await;

    let j = post(&app, "/api/incident/list", json!({"actor": "ana", "hotel": "all"})).await;
    assert_eq!(j["data"].as_array().unwrap().len(), 2);

    let j = post(&app, "/api/incident/list", json!({"actor": "root"})).await;
    assert_eq!(j["data"].as_array().unwrap().len(), 3);

    let j = post(
        &app,
        "/api/incident/list",
        json!({"actor": "ana", "status": "open"}),
    )
    .await;
    let rows = j["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["hotelId"], "H1");

    let j = post(&app, "/api/incident/list", json!({"actor": "stranger"})).await;
    assert_eq!(j["code"], 200);
    assert!(j["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn write_denial_is_403_and_read_denial_is_404() {
    let app = test_app();
    let j = post(
        &app,
        "/api/incident/create",
        json!({"actor": "olga", "data": {"hotelId": "H1"}}),
    )
    .await;
    assert_eq!(j["code"], 403);
    assert_eq!(j["message"], "not authorized");

    let id = create(&app, "ana", json!({"hotelId": "H1"})).await;
    let j = post(&app, "/api/incident/get", json!({"actor": "olga", "id": id})).await;
    assert_eq!(j["code"], 404);

    let j = post(&app, "/api/incident/history", json!({"actor": "olga", "id": id})).await;
    assert_eq!(j["code"], 200);
    assert!(j["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_entity_and_bad_input() {
    let app = test_app();
    let j = post(
        &app,
        "/api/incident/update",
        json!({"actor": "ana", "id": "nope", "data": {"status": "x"}}),
    )
    .await;
    assert_eq!(j["code"], 404);

    let j = post(
        &app,
        "/api/incident/create",
        json!({"actor": "ana", "data": {"title": "no hotel"}}),
    )
    .await;
    assert_eq!(j["code"], 400);

    let j = post(&app, "/api/spaceship/list", json!({"actor": "ana"})).await;
    assert_eq!(j["code"], 404);
}

#[tokio::test]
async fn delete_records_history_and_storage_faults_are_503() {
    let (app, store) = test_app_with_store();
    let id = create(&app, "ana", json!({"hotelId": "H2"})).await;

    let j = post(&app, "/api/incident/delete", json!({"actor": "ana", "id": id})).await;
    assert_eq!(j["code"], 200);
    let j = post(&app, "/api/incident/history", json!({"actor": "ana", "id": id})).await;
    assert_eq!(j["data"][0]["header"]["operation"], "Deleted");

    store.fail_collection("history").await;
    let j = post(
        &app,
        "/api/incident/create",
        json!({"actor": "ana", "data": {"hotelId": "H1"}}),
    )
    .await;
    assert_eq!(j["code"], 200);
    assert!(j["warning"].as_str().unwrap().contains("history"));
    assert!(j["data"].get("history_id").is_none());

    store.fail_collection("incidents").await;
    let j = post(&app, "/api/incident/list", json!({"actor": "ana"})).await;
    assert_eq!(j["code"], 503);
    assert_eq!(j["message"], "temporarily unavailable, try again");
}

#[tokio::test]
async fn stats_cover_scope() {
    let app = test_app();
    create(&app, "root", json!({"hotelId": "H1"})).await;
    create(&app, "root", json!({"hotelId": "H2", "status": "resolved"})).await;
    create(&app, "root", json!({"hotelId": "H9"})).await;

    let j = post(&app, "/api/incident/stats", json!({"actor": "ana"})).await;
    assert_eq!(j["data"]["total"], 2);
    assert_eq!(j["data"]["by_status"]["open"], 1);
    assert_eq!(j["data"]["by_status"]["resolved"], 1);

    let lost = post(
        &app,
        "/api/lost_item/stats",
        json!({"actor": "root", "hotel": "all"}),
    )
    .await;
    assert_eq!(lost["data"]["total"], 0);
}
