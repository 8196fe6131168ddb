//! End-to-end tests of the HTTP API over an in-memory store

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use intent_settlement::api;
use intent_settlement::config::EngineConfig;
use intent_settlement::state::MemoryStore;
use intent_settlement::SettlementCoordinator;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let coordinator =
        SettlementCoordinator::new(Arc::new(MemoryStore::new()), &EngineConfig::default()).unwrap();
    api::router(Arc::new(coordinator))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    send_body(app, method, uri, body).await
}

async fn send_body(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post_intent(app: &Router, actor: &str, offer: &str, want: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/intents",
        Some(json!({ "actor": actor, "offer": offer, "want": want })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn solve_and_settle_swap() {
    let app = app();
    let a = post_intent(&app, "alice", "apples", "bananas").await;
    let b = post_intent(&app, "bob", "bananas", "apples").await;

    let (status, body) = send(&app, Method::POST, &format!("/solve/{}", a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain"], json!([a, b]));

    let (status, body) = send(&app, Method::POST, "/settle", Some(json!({ "chain": [a, b] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain"], json!([a, b]));

    let (_, intent) = send(&app, Method::GET, &format!("/intents/{}", b), None).await;
    assert_eq!(intent["is_open"], json!(false));

    let (status, body) = send(&app, Method::POST, "/settle", Some(json!({ "chain": [a, b] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid or stale chain"));

    let (status, body) = send(&app, Method::GET, "/settlements", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn solve_without_counterparty_is_not_found() {
    let app = app();
    let a = post_intent(&app, "alice", "apples", "bananas").await;
    post_intent(&app, "carol", "cherries", "apples").await;

    let (status, body) = send(&app, Method::POST, &format!("/solve/{}", a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], json!("No chain found for this intent"));
}

#[tokio::test]
async fn cancel_and_lookup_unknown_intent() {
    let app = app();
    let a = post_intent(&app, "alice", "apples", "bananas").await;

    let (status, body) = send(&app, Method::DELETE, &format!("/intents/{}", a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Intent canceled"));

    let (status, body) = send(&app, Method::GET, "/intents/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], json!("Intent not found"));

    let (status, _) = send(&app, Method::DELETE, "/intents/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn intents_are_listed_newest_first() {
    let app = app();
    let first = post_intent(&app, "alice", "apples", "bananas").await;
    let second = post_intent(&app, "bob", "bananas", "apples").await;

    let (status, body) = send(&app, Method::GET, "/intents", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second, first]);
}

#[tokio::test]
async fn blank_actor_is_unprocessable() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/intents",
        Some(json!({ "actor": "  ", "offer": "apples", "want": "bananas" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_and_readiness() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], json!(true));
}

#[tokio::test]
async fn malformed_bodies_use_detail_shape() {
    let app = app();

    let (status, body) = send_body(&app, Method::POST, "/settle", Body::from("{\"chain\": [1,")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid input"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/intents",
        Some(json!({ "actor": "alice", "offer": "apples" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("want"));
}
