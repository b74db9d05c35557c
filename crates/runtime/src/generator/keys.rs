//! Automatic key allocation for keyless yields
//!
//! Script generators key their yields like array inserts: a yield without an
//! explicit key takes the next automatic integer, and any *integer* key
//! (explicit or automatic) reseeds the counter to `key + 1`. Non-integer
//! keys leave the counter alone, so `yield "x" => v` followed by a keyless
//! yield still produces key 0.

use rill_core::Value;

/// Counter state for automatic keys. Pure function of the counter and the
/// most recently produced key; no other inputs.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    next: i64,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key a keyless yield would receive right now.
    pub fn next_key(&self) -> Value {
        Value::Int(self.next)
    }

    /// Observe the key actually produced by a yield and reseed the counter
    /// when the key is an integer.
    pub fn observe(&mut self, key: &Value) {
        if let Value::Int(k) = key {
            self.next = k + 1;
        }
    }
}
