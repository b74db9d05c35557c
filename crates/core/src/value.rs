//! Value: What the language talks about
//!
//! Rill values are pure data with no pointers into runtime structures.
//! Generator keys, yielded values, sent values, and return values are all
//! `Value`s; the driver treats them as opaque apart from integer-key
//! detection.
//!
//! # Memory Layout
//!
//! Using `#[repr(C)]` ensures a predictable C-compatible layout:
//! - Discriminant (tag) at offset 0
//! - Payload data follows at a fixed offset
//!
//! This allows compiled code to read the tag and the inline Int/Bool
//! payloads directly without an FFI call.

use std::fmt;
use std::sync::Arc;

/// A Rill runtime value.
///
/// Strings are `Arc<str>` so cloning a value is O(1) and values can be
/// handed to the diagnostics thread without copying the text.
#[repr(C)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value; also the initial content of every generator slot
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer value
    Int(i64),

    /// Floating-point value (IEEE 754 double precision)
    Float(f64),

    /// Immutable string
    Str(Arc<str>),
}

impl Value {
    /// Build a string value from anything string-like.
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// True iff the value is an `Int`.
    ///
    /// This is the test that decides whether a yielded key reseeds the
    /// automatic key counter. Floats with integral content deliberately do
    /// not count (matching script semantics for array keys).
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Coerce to an integer.
    ///
    /// Script coercion rules: Null → 0, Bool → 0/1, Float truncates, and a
    /// string contributes its leading numeric prefix (or 0 if there is
    /// none).
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => i64::from(*b),
            Value::Int(n) => *n,
            Value::Float(f) => *f as i64,
            Value::Str(s) => parse_leading_int(s),
        }
    }

    /// Coerce to a float.
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Str(s) => parse_leading_float(s),
        }
    }

    /// Coerce to a boolean (Null, 0, 0.0 and "" are falsy).
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty() && s.as_ref() != "0",
        }
    }

    /// Loose equality: numeric types compare by value, everything else by
    /// strict equality after type match.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (a, b) => a == b,
        }
    }

    /// Human-readable tag name, used in error messages and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

/// Parse the leading integer prefix of a string ("12abc" → 12, "abc" → 0).
fn parse_leading_int(s: &str) -> i64 {
    let t = s.trim_start();
    let mut end = 0;
    for (i, c) in t.char_indices() {
        if c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    t[..end].parse().unwrap_or(0)
}

/// Parse the leading float prefix of a string ("3.5kg" → 3.5).
fn parse_leading_float(s: &str) -> f64 {
    let t = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in t.char_indices() {
        let ok = c.is_ascii_digit()
            || (i == 0 && (c == '-' || c == '+'))
            || (c == '.' && !seen_dot);
        if !ok {
            break;
        }
        if c == '.' {
            seen_dot = true;
        }
        end = i + c.len_utf8();
    }
    t[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_detection() {
        assert!(Value::Int(3).is_integer());
        assert!(!Value::Float(3.0).is_integer());
        assert!(!Value::from("3").is_integer());
        assert!(!Value::Null.is_integer());
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(Value::Null.as_int(), 0);
        assert_eq!(Value::Bool(true).as_int(), 1);
        assert_eq!(Value::Float(7.9).as_int(), 7);
        assert_eq!(Value::from("42abc").as_int(), 42);
        assert_eq!(Value::from("-5").as_int(), -5);
        assert_eq!(Value::from("abc").as_int(), 0);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(Value::from("3.5kg").as_float(), 3.5);
        assert_eq!(Value::Int(2).as_float(), 2.0);
        assert_eq!(Value::from("").as_float(), 0.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::from("0").truthy());
        assert!(Value::from("x").truthy());
        assert!(Value::Float(0.1).truthy());
    }

    #[test]
    fn test_loose_eq_across_numeric_types() {
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(!Value::Int(2).loose_eq(&Value::Float(2.5)));
        assert!(Value::from("a").loose_eq(&Value::from("a")));
        assert!(!Value::from("2").loose_eq(&Value::Int(2)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
