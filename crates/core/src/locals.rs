//! Lifted-locals frame for lowered function bodies
//!
//! The Rill compiler hoists every local of a generator body into a `Locals`
//! table so the body's state survives between resumptions. The runtime never
//! interprets the contents; only compiled code (and tests standing in for
//! it) reads and writes entries.
//!
//! Keys are restricted to hashable value types (Int, Str), mirroring script
//! array-key semantics.

use crate::value::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Hashable subset of `Value` usable as a locals key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalKey {
    Int(i64),
    Str(Arc<str>),
}

impl Hash for LocalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Discriminant for type safety
        std::mem::discriminant(self).hash(state);
        match self {
            LocalKey::Int(n) => n.hash(state),
            LocalKey::Str(s) => s.hash(state),
        }
    }
}

impl LocalKey {
    /// Try to convert a Value to a key; None for non-hashable types.
    pub fn from_value(value: &Value) -> Option<LocalKey> {
        match value {
            Value::Int(n) => Some(LocalKey::Int(*n)),
            Value::Str(s) => Some(LocalKey::Str(s.clone())),
            _ => None,
        }
    }

    /// Convert the key back into a Value.
    pub fn to_value(&self) -> Value {
        match self {
            LocalKey::Int(n) => Value::Int(*n),
            LocalKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<&str> for LocalKey {
    fn from(s: &str) -> Self {
        LocalKey::Str(Arc::from(s))
    }
}

impl From<i64> for LocalKey {
    fn from(n: i64) -> Self {
        LocalKey::Int(n)
    }
}

/// The lifted-variable frame of one lowered body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals {
    entries: HashMap<LocalKey, Value>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: impl Into<LocalKey>) -> Option<&Value> {
        self.entries.get(&key.into())
    }

    pub fn set(&mut self, key: impl Into<LocalKey>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: impl Into<LocalKey>) -> Option<Value> {
        self.entries.remove(&key.into())
    }

    /// Read a local with integer coercion; missing entries read as 0.
    pub fn get_int(&self, key: impl Into<LocalKey>) -> i64 {
        self.get(key).map(Value::as_int).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
