//! Rill Runtime: the generator engine for the Rill language
//!
//! Key design principles:
//! - Generators suspend by returning: the compiler lowers a generator body
//!   into a resume-point state machine, and one synchronous call of that
//!   body is one advancement
//! - The `ValueChannel` is the only shared state between driver and body;
//!   there is no green thread and no stack switch
//! - Compiled code drives everything through the C-ABI `rill_*` surface;
//!   faults park in the thread-local error cell instead of unwinding

pub mod context;
pub mod generator;
pub mod report;
pub mod serialize;

#[cfg(feature = "diagnostics")]
pub mod diagnostics;

// Re-export key types and functions
pub use context::EvalContext;
pub use generator::channel::{BodyFault, ValueChannel};
pub use generator::keys::KeyAllocator;
pub use generator::{Generator, GeneratorBody, GeneratorError, GeneratorState};

// Serialization types (for persistence/exchange with external systems)
pub use serialize::{SerializeError, TypedValue, serialize_generator, value_from_bytes, value_to_bytes};

// Core re-exports so compiled-code support crates need only one dependency
pub use rill_core::{
    LocalKey, Locals, Value, clear_runtime_error, has_runtime_error, set_runtime_error,
    take_runtime_error,
};

// Consumer protocol (exported for LLVM linking)
pub use generator::ffi::{
    rill_gen_current, rill_gen_free, rill_gen_get_return, rill_gen_key, rill_gen_new,
    rill_gen_next, rill_gen_rewind, rill_gen_send, rill_gen_state, rill_gen_throw,
    rill_gen_valid, rill_gen_wakeup,
};

// Body-side channel operations (exported for LLVM linking)
pub use generator::ffi::{
    rill_chan_finish, rill_chan_has_fault, rill_chan_local_get, rill_chan_local_set,
    rill_chan_raise, rill_chan_resume_point, rill_chan_set_resume_point, rill_chan_take_fault,
    rill_chan_take_sent, rill_chan_yield, rill_chan_yield_keyed,
};

// Value slot helpers (exported for LLVM linking)
pub use generator::ffi::{
    rill_value_bool, rill_value_clone, rill_value_drop, rill_value_float, rill_value_int,
    rill_value_null, rill_value_str,
};
