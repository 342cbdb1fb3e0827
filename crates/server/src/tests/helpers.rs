// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Router fixtures for HTTP tests.

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use parkops_persistence::Persistence;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

use crate::AppState;
use crate::extract::{ACTOR_ID_HEADER, REQUEST_ID_HEADER};
use crate::routes::build_router;

pub fn create_test_app_state() -> AppState {
    let persistence: Persistence =
        Persistence::new_in_memory().expect("Failed to create in-memory persistence");
    AppState::new(persistence, Duration::from_secs(5))
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

/// A JSON request attributed to a test operator.
pub fn actor_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header(ACTOR_ID_HEADER, "operator-7")
        .header(REQUEST_ID_HEADER, "req-1")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

/// Creates a UTC site through the router and returns its id.
pub async fn create_site(app: &Router, name: &str) -> i64 {
    let response = send(
        app,
        json_request(
            "POST",
            "/sites",
            &serde_json::json!({ "name": name, "timezone": "UTC" }),
        ),
    )
    .await;
    let site: Value = read_json(response).await;
    site["site_id"].as_i64().unwrap()
}

pub fn build_test_router(app_state: &AppState) -> Router {
    build_router(app_state.clone())
}
