//! Rill Core: the value foundation for the Rill runtime
//!
//! This crate provides the language-agnostic primitives shared by the Rill
//! runtime and by code the Rill compiler emits:
//! - `Value`: what the language talks about (Null, Bool, Int, Float, Str)
//! - `Locals`: the lifted-variable frame a lowered function body persists
//!   between resumptions
//! - `error`: thread-local error handling for FFI safety
//!
//! Compiled code links against this crate (staticlib) and observes `Value`
//! through its `#[repr(C)]` layout or through the exported C-ABI helpers.

pub mod error;
pub mod locals;
pub mod value;

// Re-export key types and functions
pub use locals::{LocalKey, Locals};
pub use value::Value;

// Error handling
pub use error::{
    clear_runtime_error, has_runtime_error, rill_clear_error as clear_error,
    rill_get_error as get_error, rill_has_error as has_error, rill_take_error as take_error,
    set_runtime_error, take_runtime_error,
};
