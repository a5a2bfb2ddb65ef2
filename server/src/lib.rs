//! Prefixed Session Library
//!
//! Session key namespacing for axum applications: several areas of one
//! application share a single session without key collisions.

pub mod config;
pub mod middleware;
pub mod routes;
pub mod session;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use middleware::{SessionKeyPrefixLayer, SessionLayerState, session_middleware};
pub use session::{
    KeyPrefix, PrefixedSession, Session, SessionError, SessionKeyPrefixConfig, SessionManager,
    SessionStore,
};
