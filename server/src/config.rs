//! Server configuration
//!
//! Configuration is loaded from environment variables.

use std::env;

use crate::session::manager::DEFAULT_MAX_SESSIONS;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,

    /// Session configuration
    pub session: SessionConfig,
}

/// Session-related configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id
    pub cookie_name: String,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
    /// Keys every area reads and writes without its prefix
    pub shared_keys: Vec<String>,
    /// Maximum live sessions; the least recently used is evicted beyond it
    pub max_concurrent_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            cookie_secure: false,
            shared_keys: vec!["lang".to_string()],
            max_concurrent_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server config
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }

        // Session config
        if let Ok(name) = env::var("SESSION_COOKIE_NAME")
            && !name.is_empty()
        {
            config.session.cookie_name = name;
        }
        if let Ok(val) = env::var("SESSION_COOKIE_SECURE") {
            config.session.cookie_secure = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(keys) = env::var("SESSION_SHARED_KEYS") {
            config.session.shared_keys = parse_list(&keys);
        }
        if let Ok(val) = env::var("MAX_CONCURRENT_SESSIONS")
            && let Ok(v) = val.parse()
        {
            config.session.max_concurrent_sessions = v;
        }

        config
    }
}
