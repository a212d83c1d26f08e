use api_lib::config::Config;
use api_lib::web::{router, state::AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use training_core::memory::InMemoryStore;
use uuid::Uuid;

/// Create a test app backed by the in-memory store.
/// Returns the router and the store, so tests can seed exercises.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState::new(store.clone(), Arc::new(Config::test_default())));
    (router(state), store)
}

/// Send a request as `user` and return the status and the decoded JSON body
/// (`Value::Null` for empty bodies).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Create a group through the API and return its id.
#[allow(dead_code)]
pub async fn create_group(app: &Router, user: Uuid, body: Value) -> Uuid {
    let (status, json) = send(app, "POST", "/groups", Some(user), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().parse().unwrap()
}

/// A three-set group with an 8-12 rep range starting at 60kg.
#[allow(dead_code)]
pub fn range_group(name: &str, exercise: Uuid) -> Value {
    json!({
        "name": name,
        "exerciseRef": exercise,
        "sets": 3,
        "repsMin": 8,
        "repsMax": 12,
        "weightMin": 60.0,
        "weightMax": 80.0,
        "restTimeSeconds": 90
    })
}

/// Create a plan through the API and return its id.
#[allow(dead_code)]
pub async fn create_plan(app: &Router, user: Uuid, name: &str, group_ids: &[Uuid]) -> Uuid {
    let (status, json) = send(
        app,
        "POST",
        "/plans",
        Some(user),
        Some(json!({ "name": name, "groupIds": group_ids })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().parse().unwrap()
}
