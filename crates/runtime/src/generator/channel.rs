//! The value channel: the shared record between driver and body
//!
//! One `ValueChannel` lives inside each generator. On every advancement the
//! driver hands the body a pointer to it; the body communicates *only* by
//! mutating the channel and returning. Because the body is compiled code
//! with a C calling convention, it cannot unwind — "throwing" out of the
//! body is expressed by writing a [`BodyFault`] into the channel before
//! returning (the same no-unwind doctrine as the thread-local error cell in
//! `rill-core`).
//!
//! The channel also carries the body's persisted frame: `resume_point` (the
//! saved program counter of the lowered state machine) and `locals` (the
//! lifted variables). The driver never touches either; between calls the
//! channel is the body's only stack.

use rill_core::{Locals, Value};

/// A fault travelling between body and consumer.
///
/// Carries the script-level exception payload plus a message. Compared
/// structurally so that propagation can be verified to pass the fault
/// through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFault {
    pub message: String,
    pub payload: Value,
}

impl BodyFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(message: impl Into<String>, payload: Value) -> Self {
        Self {
            message: message.into(),
            payload,
        }
    }
}

impl std::fmt::Display for BodyFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BodyFault {}

/// The shared mutable record of one generator.
#[derive(Debug, Default)]
pub struct ValueChannel {
    /// Last yielded value; retains its content after the generator closes
    pub(crate) current_value: Value,
    /// Last yielded (or auto-assigned) key; retained like `current_value`
    pub(crate) current_key: Value,
    /// Value staged by `send()`, consumed by the body's next resumption
    pub(crate) sent: Option<Value>,
    /// Fault staged by `throw()`, observed at the current suspension point
    pub(crate) fault_in: Option<BodyFault>,
    /// Terminal return value, written by `finish`
    pub(crate) return_value: Value,
    /// Did the body supply an explicit key this advancement
    pub(crate) user_key_set: bool,
    /// Did the body run to completion this advancement
    pub(crate) finished: bool,
    /// Fault raised by the body this advancement
    pub(crate) fault_out: Option<BodyFault>,

    /// Saved program counter of the lowered state machine (body-owned)
    pub resume_point: u32,
    /// Lifted locals of the body (body-owned)
    pub locals: Locals,
}

impl ValueChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Yield a value with an automatic key.
    pub fn yield_value(&mut self, value: Value) {
        self.current_value = value;
        self.user_key_set = false;
    }

    /// Yield an explicit key/value pair.
    pub fn yield_pair(&mut self, key: Value, value: Value) {
        self.current_value = value;
        self.current_key = key;
        self.user_key_set = true;
    }

    /// Take the value staged by `send()`, if any.
    ///
    /// The slot is cleared; a sent value is delivered to exactly one
    /// resumption.
    pub fn take_sent(&mut self) -> Option<Value> {
        self.sent.take()
    }

    /// Take the fault injected by `throw()`, if any.
    ///
    /// A body that cannot handle the fault at its suspension point must
    /// re-raise it with [`ValueChannel::raise`].
    pub fn take_fault(&mut self) -> Option<BodyFault> {
        self.fault_in.take()
    }

    /// Finish the generator with a terminal return value.
    pub fn finish(&mut self, return_value: Value) {
        self.return_value = return_value;
        self.finished = true;
    }

    /// Raise a fault out of the body.
    ///
    /// The driver propagates it unchanged to whichever consumer operation
    /// triggered this advancement.
    pub fn raise(&mut self, fault: BodyFault) {
        self.fault_out = Some(fault);
    }

    /// Last yielded value (driver-side accessor).
    pub fn current_value(&self) -> &Value {
        &self.current_value
    }

    /// Last yielded key (driver-side accessor).
    pub fn current_key(&self) -> &Value {
        &self.current_key
    }
}
