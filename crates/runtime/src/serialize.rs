//! Serialization of Rill values
//!
//! Provides a serializable representation of runtime values for persistence
//! and exchange with external systems (snapshots, IPC, storage). Uses
//! bincode for fast, compact binary encoding.
//!
//! # Why TypedValue?
//!
//! The runtime `Value` keeps strings behind `Arc<str>` and carries a
//! `#[repr(C)]` layout contract with compiled code; `TypedValue` is the
//! owned, serde-derived mirror that actually crosses process boundaries.
//!
//! # What refuses to serialize
//!
//! - Non-finite floats (NaN, ±Inf) — they do not round-trip portably.
//! - Generators — live, in-progress execution state is not data. The
//!   consumer-protocol gate (`Generator::wakeup`) and this module agree on
//!   that refusal.

use crate::generator::Generator;
use rill_core::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error during serialization/deserialization.
#[derive(Debug)]
pub enum SerializeError {
    /// Cannot serialize generators (live execution state)
    GeneratorNotSerializable,
    /// Non-finite float (NaN or Infinity)
    NonFiniteFloat(f64),
    /// Bincode encoding/decoding error (preserves original error for debugging)
    Bincode(Box<bincode::Error>),
    /// Invalid data structure
    InvalidData(String),
}

impl std::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializeError::GeneratorNotSerializable => {
                write!(f, "Generators cannot be serialized - execution state is not data")
            }
            SerializeError::NonFiniteFloat(v) => {
                write!(f, "Cannot serialize non-finite float: {}", v)
            }
            SerializeError::Bincode(e) => write!(f, "Bincode error: {}", e),
            SerializeError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializeError::Bincode(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bincode::Error> for SerializeError {
    fn from(e: bincode::Error) -> Self {
        SerializeError::Bincode(Box::new(e))
    }
}

/// Owned, serializable mirror of [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl TypedValue {
    /// Convert a runtime value into its serializable form.
    pub fn from_value(value: &Value) -> Result<TypedValue, SerializeError> {
        match value {
            Value::Null => Ok(TypedValue::Null),
            Value::Bool(b) => Ok(TypedValue::Bool(*b)),
            Value::Int(n) => Ok(TypedValue::Int(*n)),
            Value::Float(f) if f.is_finite() => Ok(TypedValue::Float(*f)),
            Value::Float(f) => Err(SerializeError::NonFiniteFloat(*f)),
            Value::Str(s) => Ok(TypedValue::Str(s.to_string())),
        }
    }

    /// Convert back into a runtime value.
    pub fn to_value(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Int(n) => Value::Int(*n),
            TypedValue::Float(f) => Value::Float(*f),
            TypedValue::Str(s) => Value::Str(Arc::from(s.as_str())),
        }
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode with bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<TypedValue, SerializeError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Encode a runtime value directly.
pub fn value_to_bytes(value: &Value) -> Result<Vec<u8>, SerializeError> {
    TypedValue::from_value(value)?.to_bytes()
}

/// Decode a runtime value directly.
pub fn value_from_bytes(bytes: &[u8]) -> Result<Value, SerializeError> {
    Ok(TypedValue::from_bytes(bytes)?.to_value())
}

/// Serialization gate for generators: always refuses.
///
/// Exists so hosts that serialize object graphs have one canonical error to
/// surface when a graph reaches a generator.
pub fn serialize_generator(_generator: &Generator) -> Result<Vec<u8>, SerializeError> {
    Err(SerializeError::GeneratorNotSerializable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        for v in [
            Value::Null,
            Value::Bool(true),
            Value::Int(-42),
            Value::Float(2.5),
            Value::from("généra"),
        ] {
            let bytes = value_to_bytes(&v).unwrap();
            assert_eq!(value_from_bytes(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn test_non_finite_float_refused() {
        let err = value_to_bytes(&Value::Float(f64::NAN)).unwrap_err();
        assert!(matches!(err, SerializeError::NonFiniteFloat(_)));
        assert!(value_to_bytes(&Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_garbage_bytes_refused() {
        let err = TypedValue::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, SerializeError::Bincode(_)));
    }
}
