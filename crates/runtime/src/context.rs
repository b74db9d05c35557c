//! Evaluation context threaded through to lowered bodies
//!
//! One `EvalContext` exists per script execution (the host creates it and
//! keeps it alive for the duration). The generator driver passes it to the
//! body on every advancement and never interprets it; it exists so compiled
//! code can reach script globals without ambient state.

use rill_core::{Locals, Value};

/// Host execution context, opaque to the generator driver.
#[derive(Debug, Default)]
pub struct EvalContext {
    /// Script-global variables
    pub globals: Locals,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience accessor used by host embeddings and tests.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.set(name, value);
    }
}
