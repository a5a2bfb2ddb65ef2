//! Test Utilities Module
//!
//! Provides a cookie-aware client over the demo router for unit tests.
//! This module is only compiled when running tests.

#![cfg(test)]

use crate::config::SessionConfig;
use crate::middleware::SessionLayerState;
use crate::routes::app_routes;
use crate::session::{SessionData, SessionManager};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::util::ServiceExt;

// ============================================================================
// Test Context
// ============================================================================

/// Test context holding the router, its session manager and one client's cookie
pub struct TestContext {
    pub manager: Arc<SessionManager>,
    pub router: Router,
    pub cookie_name: String,
    /// Session id issued to this client, once a response has set it
    pub session_id: Option<String>,
}

impl TestContext {
    /// Create a new test context with default session config
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let state = SessionLayerState::from_config(&config);
        let manager = Arc::clone(&state.manager);
        let router =
            app_routes(state, &config.shared_keys).expect("Failed to build test router");
        Self {
            manager,
            router,
            cookie_name: config.cookie_name,
            session_id: None,
        }
    }

    /// Variables currently stored for this client's session
    pub fn session_data(&self) -> SessionData {
        let id = self.session_id.as_deref().expect("No session issued yet");
        self.manager.snapshot(id).expect("Session missing from manager")
    }

    /// Send a request, attaching and capturing the session cookie
    pub async fn request(&mut self, mut request: Request<Body>) -> Response {
        if let Some(id) = &self.session_id {
            let cookie = format!("{}={}", self.cookie_name, id);
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().expect("Invalid cookie"));
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        if let Some(id) = session_cookie(&response, &self.cookie_name) {
            self.session_id = Some(id);
        }
        response
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&mut self, uri: &str) -> (StatusCode, Option<T>) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        read_json(self.request(request).await).await
    }

    /// Make a POST request with JSON body and parse JSON response
    pub async fn post_json<T: DeserializeOwned>(
        &mut self,
        uri: &str,
        body: impl serde::Serialize,
    ) -> (StatusCode, Option<T>) {
        let body_bytes = serde_json::to_vec(&body).expect("Failed to serialize body");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body_bytes))
            .expect("Failed to build request");
        read_json(self.request(request).await).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Session id from a response's `Set-Cookie` header
pub fn session_cookie(response: &Response, cookie_name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> (StatusCode, Option<T>) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    (status, serde_json::from_slice(&body).ok())
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Initialize test logging with detailed output
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prefixed_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// ============================================================================
// Tests for Test Utilities
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_context_creation() {
        let ctx = TestContext::new();
        assert_eq!(ctx.manager.session_count(), 0);
        assert!(ctx.session_id.is_none());
    }

    #[tokio::test]
    async fn test_first_request_issues_cookie() {
        init_test_logging();
        let mut ctx = TestContext::new();

        let (status, _) = ctx.get_json::<Value>("/shop/cart").await;

        assert_eq!(status, StatusCode::OK);
        assert!(ctx.session_id.is_some());
        assert_eq!(ctx.manager.session_count(), 1);
    }

    #[tokio::test]
    async fn test_cookie_is_reused() {
        let mut ctx = TestContext::new();
        ctx.get_json::<Value>("/shop/cart").await;
        let first = ctx.session_id.clone();

        let request = Request::builder()
            .uri("/admin/cart")
            .body(Body::empty())
            .unwrap();
        let response = ctx.request(request).await;

        assert!(session_cookie(&response, "sid").is_none());
        assert_eq!(ctx.session_id, first);
        assert_eq!(ctx.manager.session_count(), 1);
    }
}
