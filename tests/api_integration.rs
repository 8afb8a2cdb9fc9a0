//! End-to-end API integration tests
//!
//! These tests verify the HTTP API flows including:
//! - Roster management
//! - Command submission and queue operations
//! - State, event backlog and connection endpoints

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use common::{simulated_router, wait_for_quiet};
use serde_json::{json, Value};
use squad_api::agents::CommandRouter;
use squad_api::api;
use tower::util::ServiceExt; // for oneshot

/// Setup test application on a seeded, simulator-only router
async fn setup_app() -> (Router, CommandRouter) {
    let router = simulated_router().await;
    (api::router(router.clone()), router)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&payload).unwrap()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _router) = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_list_default_roster() {
    let (app, _router) = setup_app().await;

    let response = app.oneshot(get("/api/agents")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let agents = json.as_array().unwrap();
    assert_eq!(agents.len(), 3);
    assert_eq!(agents[0]["id"], "cobb");
    assert_eq!(agents[0]["status"], "idle");
    assert_eq!(agents[1]["name"], "Ariadne");
}

#[tokio::test]
async fn test_add_and_remove_agent() {
    let (app, router) = setup_app().await;

    let payload = json!({
        "name": "Saito",
        "role": "Investor",
        "emoji": "💼"
    });
    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/agents", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["id"], "saito");
    assert_eq!(json["emoji"], "💼");
    assert_eq!(router.list_agents().await.len(), 4);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/agents/saito")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(router.find_agent("saito").await.is_none());
}

#[tokio::test]
async fn test_add_agent_with_blank_name_fails() {
    let (app, _router) = setup_app().await;

    let payload = json!({ "name": "  ", "role": "Investor" });
    let response = app
        .oneshot(send_json("POST", "/api/agents", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn test_remove_unknown_agent_returns_not_found() {
    let (app, _router) = setup_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/agents/saito")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_command_is_accepted_and_queued() {
    let (app, router) = setup_app().await;

    let payload = json!({ "text": "plan the heist", "target_agent_id": "cobb" });
    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/commands", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["assigned_agent_id"], "cobb");
    assert_eq!(json["command"]["text"], "plan the heist");
    assert!(json["id"].is_string());

    wait_for_quiet(&router).await;

    let response = app.oneshot(get("/api/queue?agent_id=cobb")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let queue = json.as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["status"], "done");
}

#[tokio::test]
async fn test_submit_blank_command_fails() {
    let (app, _router) = setup_app().await;

    let response = app
        .oneshot(send_json("POST", "/api/commands", json!({ "text": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_to_unknown_agent_returns_not_found() {
    let (app, _router) = setup_app().await;

    let payload = json!({ "text": "buy the airline", "target_agent_id": "saito" });
    let response = app
        .oneshot(send_json("POST", "/api/commands", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_without_agents_returns_conflict() {
    let router = CommandRouter::simulated(squad_api::agents::SimulatorPacing::instant());
    let app = api::router(router);

    let response = app
        .oneshot(send_json("POST", "/api/commands", json!({ "text": "status" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_unknown_item_returns_not_found() {
    let (app, _router) = setup_app().await;

    let uri = format!("/api/queue/{}/cancel", uuid::Uuid::now_v7());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reorder_unknown_item_returns_not_found() {
    let (app, _router) = setup_app().await;

    let uri = format!("/api/queue/{}/reorder", uuid::Uuid::now_v7());
    let response = app
        .oneshot(send_json("POST", &uri, json!({ "position": 0 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_state_and_event_backlog() {
    let (app, router) = setup_app().await;
    router.submit("status", Some("eames")).await.unwrap();
    wait_for_quiet(&router).await;

    let response = app.clone().oneshot(get("/api/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let state = body_json(response).await;
    assert_eq!(state["agents"].as_array().unwrap().len(), 3);
    assert_eq!(state["queue"].as_array().unwrap().len(), 1);
    let last_seq = state["last_seq"].as_u64().unwrap();
    assert!(last_seq > 0);

    let response = app.clone().oneshot(get("/api/events?since=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let events = body_json(response).await;
    let events = events.as_array().unwrap();
    assert_eq!(events.last().unwrap()["seq"].as_u64(), Some(last_seq));
    assert_eq!(events[0]["event"]["type"], "agent-added");

    let uri = format!("/api/events?since={}", last_seq);
    let response = app.oneshot(get(&uri)).await.unwrap();
    let events = body_json(response).await;
    assert!(events.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_status_and_reconnect() {
    let (app, _router) = setup_app().await;

    let response = app.clone().oneshot(get("/api/connection")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["state"].is_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/connection/reconnect")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "error");
    assert!(json["error"].is_string());
}
