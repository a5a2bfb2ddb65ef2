//! Session store capability
//!
//! Anything that maps string keys to JSON values for one user session can sit
//! behind a [`SessionStore`]. The host keeps one [`SessionData`] per session;
//! [`PrefixedSession`](super::prefix::PrefixedSession) decorates any store.

use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;

/// Key-value access to one session's variables
pub trait SessionStore {
    /// Failure raised by the backing storage
    type Error;

    /// Read the value stored at `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error>;

    /// Assign `value` to `key`, replacing any previous value
    fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error>;

    /// Insert `value` at `key`
    ///
    /// Stores that distinguish insertion from assignment override this;
    /// by default it behaves like [`SessionStore::set`].
    fn add(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        self.set(key, value)
    }

    fn contains_key(&self, key: &str) -> Result<bool, Self::Error>;

    /// Remove `key`, returning the value it held
    fn remove(&mut self, key: &str) -> Result<Option<Value>, Self::Error>;

    /// All keys currently present, in no particular order
    fn keys(&self) -> Result<Vec<String>, Self::Error>;
}

impl<S: SessionStore + ?Sized> SessionStore for &mut S {
    type Error = S::Error;

    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        (**self).set(key, value)
    }

    fn add(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        (**self).add(key, value)
    }

    fn contains_key(&self, key: &str) -> Result<bool, Self::Error> {
        (**self).contains_key(key)
    }

    fn remove(&mut self, key: &str) -> Result<Option<Value>, Self::Error> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, Self::Error> {
        (**self).keys()
    }
}

/// In-memory variables of a single session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    values: HashMap<String, Value>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a value without cloning it
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

impl SessionStore for SessionData {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn contains_key(&self, key: &str) -> Result<bool, Self::Error> {
        Ok(self.values.contains_key(key))
    }

    fn remove(&mut self, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.values.remove(key))
    }

    fn keys(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.values.keys().cloned().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for SessionData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
