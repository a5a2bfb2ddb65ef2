//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use prefixed_session::config::SessionConfig;
use prefixed_session::routes::app_routes;
use prefixed_session::{SessionLayerState, SessionManager};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::util::ServiceExt;
use tower_http::cors::{Any, CorsLayer};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create a test application router along with its session manager
pub fn create_test_app_with_manager(config: &SessionConfig) -> (Router, Arc<SessionManager>) {
    let state = SessionLayerState::from_config(config);
    let manager = Arc::clone(&state.manager);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app_routes(state, &config.shared_keys)
        .expect("Failed to build routes")
        .route("/health", get(health))
        .layer(cors);

    (app, manager)
}

/// Create a test application router with default session config
pub fn create_test_app() -> Router {
    create_test_app_with_manager(&SessionConfig::default()).0
}

/// Build a request, optionally carrying a cookie header and JSON body
pub fn build_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and return status, `name=value` of any issued cookie, and JSON body
pub async fn send<T: DeserializeOwned>(
    app: &Router,
    request: Request<Body>,
) -> (StatusCode, Option<String>, Option<T>) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(String::from);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, cookie, serde_json::from_slice(&body).ok())
}
