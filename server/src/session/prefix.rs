//! Session key namespacing
//!
//! A [`PrefixedSession`] wraps any [`SessionStore`] and rewrites every key it
//! sees to `[PREFIX]key`, so several application areas can share one session
//! without trampling each other's variables. Keys in the exemption set are
//! passed through literally.
//!
//! Reads fall back to the unprefixed key when no prefixed entry exists. This
//! keeps values written before an area adopted a prefix readable; once the
//! area writes the key again the prefixed entry shadows the legacy one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use super::store::SessionStore;

/// Session key the host uses for temp data; never prefixed
pub const TEMP_DATA_KEY: &str = "__temp_data";

/// Errors raised while building a [`KeyPrefix`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("Session key prefix must not be empty")]
    EmptyPrefix,
}

/// Declarative options for namespacing the session of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeyPrefixConfig {
    /// Namespace applied to every non-exempt key
    pub prefix: String,
    /// Keys read and written without the prefix
    #[serde(default)]
    pub ignore_keys: Vec<String>,
}

impl SessionKeyPrefixConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ignore_keys: Vec::new(),
        }
    }

    pub fn ignore_key(mut self, key: impl Into<String>) -> Self {
        self.ignore_keys.push(key.into());
        self
    }
}

/// Normalized prefix plus the set of keys exempt from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefix {
    /// Bracketed, upper-cased form, e.g. `[AREA1]`
    prefix: String,
    ignore_keys: HashSet<String>,
}

impl KeyPrefix {
    /// Build a prefix from a raw name and extra exempt keys
    ///
    /// The name is upper-cased and wrapped in brackets as given, surrounding
    /// whitespace included. [`TEMP_DATA_KEY`] is always exempt. Blank names
    /// are rejected.
    pub fn new<I, K>(prefix: &str, ignore_keys: I) -> Result<Self, PrefixError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        if prefix.trim().is_empty() {
            return Err(PrefixError::EmptyPrefix);
        }

        let mut ignore_keys: HashSet<String> = ignore_keys.into_iter().map(Into::into).collect();
        ignore_keys.insert(TEMP_DATA_KEY.to_string());

        Ok(Self {
            prefix: format!("[{}]", prefix.to_uppercase()),
            ignore_keys,
        })
    }

    /// Prefix with no exemptions besides temp data
    pub fn named(prefix: &str) -> Result<Self, PrefixError> {
        Self::new(prefix, std::iter::empty::<String>())
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Case-sensitive exemption check
    pub fn is_exempt(&self, key: &str) -> bool {
        self.ignore_keys.contains(key)
    }

    /// Storage key for `key` when it is not exempt
    pub fn apply(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl TryFrom<&SessionKeyPrefixConfig> for KeyPrefix {
    type Error = PrefixError;

    fn try_from(config: &SessionKeyPrefixConfig) -> Result<Self, Self::Error> {
        KeyPrefix::new(&config.prefix, config.ignore_keys.iter().cloned())
    }
}

impl TryFrom<SessionKeyPrefixConfig> for KeyPrefix {
    type Error = PrefixError;

    fn try_from(config: SessionKeyPrefixConfig) -> Result<Self, Self::Error> {
        KeyPrefix::new(&config.prefix, config.ignore_keys)
    }
}

impl std::fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// Store decorator that namespaces keys with a [`KeyPrefix`]
///
/// Borrows the underlying store; nothing is copied. Errors from the store are
/// returned unchanged.
pub struct PrefixedSession<'a, S: ?Sized> {
    store: &'a mut S,
    prefix: &'a KeyPrefix,
}

impl<'a, S: SessionStore + ?Sized> PrefixedSession<'a, S> {
    pub fn new(store: &'a mut S, prefix: &'a KeyPrefix) -> Self {
        Self { store, prefix }
    }

    pub fn prefix(&self) -> &KeyPrefix {
        self.prefix
    }
}

impl<S: SessionStore + ?Sized> SessionStore for PrefixedSession<'_, S> {
    type Error = S::Error;

    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        if self.prefix.is_exempt(key) {
            return self.store.get(key);
        }

        let prefixed = self.prefix.apply(key);
        if self.store.contains_key(&prefixed)? {
            self.store.get(&prefixed)
        } else {
            self.store.get(key)
        }
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        if self.prefix.is_exempt(key) {
            self.store.set(key, value)
        } else {
            self.store.set(&self.prefix.apply(key), value)
        }
    }

    fn add(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        if self.prefix.is_exempt(key) {
            self.store.add(key, value)
        } else {
            self.store.add(&self.prefix.apply(key), value)
        }
    }

    fn contains_key(&self, key: &str) -> Result<bool, Self::Error> {
        if self.prefix.is_exempt(key) {
            return self.store.contains_key(key);
        }
        Ok(self.store.contains_key(&self.prefix.apply(key))? || self.store.contains_key(key)?)
    }

    /// Only the prefixed entry is removed; a legacy unprefixed value stays
    /// visible through the read fallback.
    fn remove(&mut self, key: &str) -> Result<Option<Value>, Self::Error> {
        if self.prefix.is_exempt(key) {
            self.store.remove(key)
        } else {
            self.store.remove(&self.prefix.apply(key))
        }
    }

    fn keys(&self) -> Result<Vec<String>, Self::Error> {
        self.store.keys()
    }
}
