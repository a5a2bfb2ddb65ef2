//! Request-scoped session handle
//!
//! Handlers extract a [`Session`] and read or write variables through it. When
//! a [`SessionKeyPrefixLayer`](crate::middleware::SessionKeyPrefixLayer) sits
//! in front of the handler, the handle carries a [`KeyPrefix`] and every call
//! goes through a [`PrefixedSession`]; handler code is the same either way.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::Arc;

use super::manager::{SessionError, SessionId, SessionManager};
use super::prefix::{KeyPrefix, PrefixedSession, TEMP_DATA_KEY};
use super::store::SessionStore;

type DynStore<'a> = dyn SessionStore<Error = Infallible> + 'a;

/// Handle to the current request's session
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    manager: Arc<SessionManager>,
    prefix: Option<Arc<KeyPrefix>>,
}

impl Session {
    pub fn new(id: SessionId, manager: Arc<SessionManager>) -> Self {
        Self {
            id,
            manager,
            prefix: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Prefix installed for this request, if any
    pub fn prefix(&self) -> Option<&KeyPrefix> {
        self.prefix.as_deref()
    }

    /// Same session, accessed through `prefix`
    ///
    /// Replaces any prefix already installed: the innermost layer wins.
    pub fn with_prefix(&self, prefix: Arc<KeyPrefix>) -> Self {
        Self {
            id: self.id.clone(),
            manager: Arc::clone(&self.manager),
            prefix: Some(prefix),
        }
    }

    /// End the session, dropping every area's variables
    pub fn destroy(&self) -> bool {
        self.manager.destroy(&self.id)
    }

    fn access<R>(
        &self,
        f: impl FnOnce(&mut DynStore<'_>) -> Result<R, Infallible>,
    ) -> Result<R, SessionError> {
        let outcome = self.manager.with_data(&self.id, |data| match self.prefix.as_deref() {
            Some(prefix) => f(&mut PrefixedSession::new(data, prefix)),
            None => f(data),
        })?;
        match outcome {
            Ok(value) => Ok(value),
            Err(never) => match never {},
        }
    }

    pub fn get_value(&self, key: &str) -> Result<Option<Value>, SessionError> {
        self.access(|store| store.get(key))
    }

    pub fn set_value(&self, key: &str, value: Value) -> Result<(), SessionError> {
        self.access(|store| store.set(key, value))
    }

    pub fn add_value(&self, key: &str, value: Value) -> Result<(), SessionError> {
        self.access(|store| store.add(key, value))
    }

    pub fn contains_key(&self, key: &str) -> Result<bool, SessionError> {
        self.access(|store| store.contains_key(key))
    }

    pub fn remove(&self, key: &str) -> Result<Option<Value>, SessionError> {
        self.access(|store| store.remove(key))
    }

    /// Read and deserialize a variable
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.get_value(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a variable
    pub fn insert<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value)
    }

    /// Stash a value for a later request; it survives until taken
    ///
    /// Temp data lives under [`TEMP_DATA_KEY`], which is never prefixed, so a
    /// value stashed in one area can be picked up in another.
    pub fn set_temp<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.access(|store| {
            let mut temp = match store.get(TEMP_DATA_KEY)? {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            temp.insert(key.to_string(), value);
            store.set(TEMP_DATA_KEY, Value::Object(temp))
        })
    }

    /// Remove and return a temp value
    pub fn take_temp<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let taken = self.access(|store| {
            let Some(Value::Object(mut temp)) = store.get(TEMP_DATA_KEY)? else {
                return Ok(None);
            };
            let taken = temp.remove(key);
            if taken.is_some() {
                if temp.is_empty() {
                    store.remove(TEMP_DATA_KEY)?;
                } else {
                    store.set(TEMP_DATA_KEY, Value::Object(temp))?;
                }
            }
            Ok(taken)
        })?;

        match taken {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("prefix", &self.prefix.as_deref().map(KeyPrefix::as_str))
            .finish()
    }
}

/// Error body returned when a session operation fails inside a handler
#[derive(Debug, Serialize)]
pub struct SessionErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<SessionError> for SessionErrorResponse {
    fn from(e: SessionError) -> Self {
        let code = match &e {
            SessionError::NotFound(_) => "session_not_found",
            SessionError::Serialization(_) => "invalid_value",
            SessionError::Missing => "session_missing",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for SessionErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "session_not_found" => StatusCode::NOT_FOUND,
            "invalid_value" => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        SessionErrorResponse::from(self).into_response()
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = SessionErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session extractor used on a route without session middleware");
            SessionError::Missing.into()
        })
    }
}
