//! Request pipeline for sessions
//!
//! [`session_middleware`] attaches the caller's [`Session`] to every request.
//! [`SessionKeyPrefixLayer`] is applied per route (or per nested router) and
//! swaps that handle for one that namespaces keys before the handler runs.
//!
//! ```ignore
//! Router::new()
//!     .route("/cart", get(cart))
//!     .route_layer(SessionKeyPrefixLayer::new(KeyPrefix::new("shop", ["lang"])?))
//!     .layer(axum::middleware::from_fn_with_state(sessions, session_middleware))
//! ```

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::session::{KeyPrefix, PrefixError, Session, SessionKeyPrefixConfig, SessionManager};

/// State shared by the session middleware
#[derive(Clone)]
pub struct SessionLayerState {
    pub manager: Arc<SessionManager>,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl SessionLayerState {
    /// State with a fresh manager sized from `config`
    pub fn from_config(config: &SessionConfig) -> Self {
        let manager = SessionManager::with_max_sessions(config.max_concurrent_sessions);
        Self::new(Arc::new(manager), config)
    }

    pub fn new(manager: Arc<SessionManager>, config: &SessionConfig) -> Self {
        Self {
            manager,
            cookie_name: config.cookie_name.clone(),
            cookie_secure: config.cookie_secure,
        }
    }

    /// Pull the session id out of the request's `Cookie` headers
    fn session_id_from(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
    }

    fn set_cookie(&self, id: &str) -> Option<HeaderValue> {
        let secure = if self.cookie_secure { "; Secure" } else { "" };
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
            self.cookie_name, id, secure
        );
        HeaderValue::from_str(&cookie).ok()
    }
}

/// Attach the caller's session, issuing a cookie when a new one is created
pub async fn session_middleware(
    State(state): State<SessionLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = state.session_id_from(request.headers());
    let (id, created) = state.manager.resolve(presented.as_deref());

    request
        .extensions_mut()
        .insert(Session::new(id.clone(), Arc::clone(&state.manager)));

    let mut response = next.run(request).await;

    if created {
        match state.set_cookie(&id) {
            Some(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            None => warn!("Session cookie for {} is not a valid header value", id),
        }
    }

    response
}

/// Namespaces the session keys of every request passing through it
#[derive(Debug, Clone)]
pub struct SessionKeyPrefixLayer {
    prefix: Arc<KeyPrefix>,
}

impl SessionKeyPrefixLayer {
    pub fn new(prefix: KeyPrefix) -> Self {
        Self {
            prefix: Arc::new(prefix),
        }
    }

    pub fn from_config(config: &SessionKeyPrefixConfig) -> Result<Self, PrefixError> {
        Ok(Self::new(KeyPrefix::try_from(config)?))
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }
}

impl<S> Layer<S> for SessionKeyPrefixLayer {
    type Service = SessionKeyPrefix<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionKeyPrefix {
            inner,
            prefix: Arc::clone(&self.prefix),
        }
    }
}

/// Service produced by [`SessionKeyPrefixLayer`]
#[derive(Debug, Clone)]
pub struct SessionKeyPrefix<S> {
    inner: S,
    prefix: Arc<KeyPrefix>,
}

impl<S, B> Service<axum::http::Request<B>> for SessionKeyPrefix<S>
where
    S: Service<axum::http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: axum::http::Request<B>) -> Self::Future {
        let prefixed = request
            .extensions()
            .get::<Session>()
            .map(|session| session.with_prefix(Arc::clone(&self.prefix)));

        match prefixed {
            Some(session) => {
                debug!(
                    session = session.id(),
                    prefix = self.prefix.as_str(),
                    "Applying session key prefix"
                );
                request.extensions_mut().insert(session);
            }
            None => warn!(
                prefix = self.prefix.as_str(),
                uri = %request.uri(),
                "No session on request; session key prefix not applied"
            ),
        }

        self.inner.call(request)
    }
}
