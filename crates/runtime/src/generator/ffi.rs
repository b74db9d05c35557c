//! C-ABI surface for compiled Rill code
//!
//! The Rill compiler lowers `yield` / `yield from` / generator protocol
//! calls into calls of these functions. Three groups:
//!
//! - `rill_gen_*`: the consumer protocol, operating on a `*mut Generator`
//! - `rill_chan_*`: body-side channel operations, operating on the
//!   `*mut ValueChannel` the body receives as an argument
//! - `rill_value_*`: slot constructors so compiled code can build and
//!   destroy `Value`s without knowing their internals
//!
//! ## Error discipline
//!
//! Nothing here unwinds on a protocol fault. Operations that can fail
//! return `false` and park the fault message in the thread-local error cell
//! (`rill_has_error` / `rill_take_error` in `rill-core`). Null-pointer
//! misuse is a compiler bug, not a script error, and asserts.
//!
//! ## Out parameters
//!
//! Results are written with `ptr::write` into caller-provided slots, so the
//! slot must be uninitialized or hold a value the caller has already
//! dropped; compiled code manages slot lifetimes with `rill_value_drop`.

use super::channel::{BodyFault, ValueChannel};
use super::{Generator, GeneratorBody};
use crate::context::EvalContext;
use rill_core::{Value, set_runtime_error};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

/// Read a C string argument, tolerating null.
unsafe fn cstr_arg(msg: *const c_char) -> String {
    if msg.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

// ---------------------------------------------------------------------------
// Consumer protocol
// ---------------------------------------------------------------------------

/// Create a generator bound to a lowered body.
///
/// `receiver` may be null (static generator functions). The receiver value
/// is cloned; `ctx` is borrowed for the generator's lifetime.
///
/// # Safety
/// `body` must follow the [`GeneratorBody`] contract; `ctx` must outlive
/// the generator; `receiver` must be null or point to a valid `Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_new(
    ctx: *mut EvalContext,
    receiver: *const Value,
    body: GeneratorBody,
) -> *mut Generator {
    let receiver = if receiver.is_null() {
        None
    } else {
        Some(unsafe { (*receiver).clone() })
    };
    Box::into_raw(Box::new(unsafe { Generator::new(ctx, receiver, body) }))
}

/// Release a generator without resuming its body.
///
/// # Safety
/// `generator` must be a pointer from `rill_gen_new`, not freed before.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_free(generator: *mut Generator) {
    if !generator.is_null() {
        drop(unsafe { Box::from_raw(generator) });
    }
}

/// Current lifecycle state as an integer tag (see [`super::GeneratorState`]).
///
/// # Safety
/// `generator` must point to a live generator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_state(generator: *const Generator) -> i32 {
    assert!(!generator.is_null(), "rill_gen_state: null generator");
    unsafe { &*generator }.state() as i32
}

/// Rewind to the first yield. Fails once the generator has progressed
/// beyond it.
///
/// # Safety
/// `generator` must point to a live generator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_rewind(generator: *mut Generator) -> bool {
    assert!(!generator.is_null(), "rill_gen_rewind: null generator");
    report_unit(unsafe { &mut *generator }.rewind())
}

/// True iff the generator is suspended at a yield.
///
/// # Safety
/// `generator` must point to a live generator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_valid(generator: *mut Generator) -> bool {
    assert!(!generator.is_null(), "rill_gen_valid: null generator");
    match unsafe { &mut *generator }.valid() {
        Ok(v) => v,
        Err(e) => {
            set_runtime_error(e.to_string());
            false
        }
    }
}

/// Write the current value into `out`.
///
/// # Safety
/// `generator` live; `out` a writable, uninitialized slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_current(generator: *mut Generator, out: *mut Value) -> bool {
    assert!(!generator.is_null(), "rill_gen_current: null generator");
    report_value(unsafe { &mut *generator }.current(), out)
}

/// Write the current key into `out`.
///
/// # Safety
/// `generator` live; `out` a writable, uninitialized slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_key(generator: *mut Generator, out: *mut Value) -> bool {
    assert!(!generator.is_null(), "rill_gen_key: null generator");
    report_value(unsafe { &mut *generator }.key(), out)
}

/// Advance to the next yield (no-op once closed).
///
/// # Safety
/// `generator` must point to a live generator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_next(generator: *mut Generator) -> bool {
    assert!(!generator.is_null(), "rill_gen_next: null generator");
    report_unit(unsafe { &mut *generator }.next())
}

/// Send `value` into the generator; writes the resulting current value.
///
/// # Safety
/// `generator` live; `value` a valid `Value`; `out` a writable slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_send(
    generator: *mut Generator,
    value: *const Value,
    out: *mut Value,
) -> bool {
    assert!(!generator.is_null(), "rill_gen_send: null generator");
    assert!(!value.is_null(), "rill_gen_send: null value");
    let value = unsafe { (*value).clone() };
    report_value(unsafe { &mut *generator }.send(value), out)
}

/// Throw a fault into the generator; writes the resulting current value.
///
/// When the generator is not suspended the fault is re-raised to the caller
/// through the error cell without invoking the body.
///
/// # Safety
/// `generator` live; `payload` null or a valid `Value`; `out` a writable
/// slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_throw(
    generator: *mut Generator,
    payload: *const Value,
    message: *const c_char,
    out: *mut Value,
) -> bool {
    assert!(!generator.is_null(), "rill_gen_throw: null generator");
    let payload = if payload.is_null() {
        Value::Null
    } else {
        unsafe { (*payload).clone() }
    };
    let fault = BodyFault::with_payload(unsafe { cstr_arg(message) }, payload);
    report_value(unsafe { &mut *generator }.throw(fault), out)
}

/// Write the terminal return value into `out`. Fails until the body has
/// returned.
///
/// # Safety
/// `generator` live; `out` a writable slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_get_return(
    generator: *const Generator,
    out: *mut Value,
) -> bool {
    assert!(!generator.is_null(), "rill_gen_get_return: null generator");
    report_value(unsafe { &*generator }.get_return(), out)
}

/// Unserialize hook: always fails, generators are live execution state.
///
/// # Safety
/// `generator` must point to a live generator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_gen_wakeup(generator: *const Generator) -> bool {
    assert!(!generator.is_null(), "rill_gen_wakeup: null generator");
    report_unit(unsafe { &*generator }.wakeup())
}

fn report_unit(result: Result<(), super::GeneratorError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            set_runtime_error(e.to_string());
            false
        }
    }
}

fn report_value(result: Result<Value, super::GeneratorError>, out: *mut Value) -> bool {
    match result {
        Ok(v) => {
            if !out.is_null() {
                unsafe { ptr::write(out, v) };
            }
            true
        }
        Err(e) => {
            set_runtime_error(e.to_string());
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Body-side channel operations
// ---------------------------------------------------------------------------

/// Yield a value with an automatic key.
///
/// # Safety
/// `channel` is the pointer passed to the body; `value` a valid `Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_yield(channel: *mut ValueChannel, value: *const Value) {
    assert!(!channel.is_null(), "rill_chan_yield: null channel");
    assert!(!value.is_null(), "rill_chan_yield: null value");
    unsafe { &mut *channel }.yield_value(unsafe { (*value).clone() });
}

/// Yield an explicit key/value pair.
///
/// # Safety
/// `channel` is the pointer passed to the body; `key` and `value` valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_yield_keyed(
    channel: *mut ValueChannel,
    key: *const Value,
    value: *const Value,
) {
    assert!(!channel.is_null(), "rill_chan_yield_keyed: null channel");
    assert!(!key.is_null(), "rill_chan_yield_keyed: null key");
    assert!(!value.is_null(), "rill_chan_yield_keyed: null value");
    unsafe { &mut *channel }.yield_pair(unsafe { (*key).clone() }, unsafe { (*value).clone() });
}

/// Finish the generator with a terminal return value.
///
/// # Safety
/// `channel` is the pointer passed to the body; `value` null means Null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_finish(channel: *mut ValueChannel, value: *const Value) {
    assert!(!channel.is_null(), "rill_chan_finish: null channel");
    let value = if value.is_null() {
        Value::Null
    } else {
        unsafe { (*value).clone() }
    };
    unsafe { &mut *channel }.finish(value);
}

/// Raise a fault out of the body; the driver propagates it unchanged.
///
/// # Safety
/// `channel` is the pointer passed to the body; `payload` null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_raise(
    channel: *mut ValueChannel,
    payload: *const Value,
    message: *const c_char,
) {
    assert!(!channel.is_null(), "rill_chan_raise: null channel");
    let payload = if payload.is_null() {
        Value::Null
    } else {
        unsafe { (*payload).clone() }
    };
    let fault = BodyFault::with_payload(unsafe { cstr_arg(message) }, payload);
    unsafe { &mut *channel }.raise(fault);
}

/// Take the pending sent value, writing it into `out`. Returns false (and
/// leaves `out` untouched) when nothing was sent.
///
/// # Safety
/// `channel` is the pointer passed to the body; `out` a writable slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_take_sent(channel: *mut ValueChannel, out: *mut Value) -> bool {
    assert!(!channel.is_null(), "rill_chan_take_sent: null channel");
    match unsafe { &mut *channel }.take_sent() {
        Some(v) => {
            if !out.is_null() {
                unsafe { ptr::write(out, v) };
            }
            true
        }
        None => false,
    }
}

/// True iff a fault is pending at this suspension point.
///
/// # Safety
/// `channel` is the pointer passed to the body.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_has_fault(channel: *const ValueChannel) -> bool {
    assert!(!channel.is_null(), "rill_chan_has_fault: null channel");
    unsafe { &*channel }.fault_in.is_some()
}

/// Take the pending fault's payload, writing it into `out`. A body that
/// cannot handle the fault must re-raise it via `rill_chan_raise`.
///
/// # Safety
/// `channel` is the pointer passed to the body; `out` a writable slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_take_fault(channel: *mut ValueChannel, out: *mut Value) -> bool {
    assert!(!channel.is_null(), "rill_chan_take_fault: null channel");
    match unsafe { &mut *channel }.take_fault() {
        Some(fault) => {
            if !out.is_null() {
                unsafe { ptr::write(out, fault.payload) };
            }
            true
        }
        None => false,
    }
}

/// Saved resume point of the lowered state machine.
///
/// # Safety
/// `channel` is the pointer passed to the body.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_resume_point(channel: *const ValueChannel) -> u32 {
    assert!(!channel.is_null(), "rill_chan_resume_point: null channel");
    unsafe { &*channel }.resume_point
}

/// Update the saved resume point before returning from the body.
///
/// # Safety
/// `channel` is the pointer passed to the body.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_set_resume_point(channel: *mut ValueChannel, point: u32) {
    assert!(!channel.is_null(), "rill_chan_set_resume_point: null channel");
    unsafe { &mut *channel }.resume_point = point;
}

/// Read a lifted local into `out`; false when unset.
///
/// # Safety
/// `channel` is the pointer passed to the body; `name` a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_local_get(
    channel: *const ValueChannel,
    name: *const c_char,
    out: *mut Value,
) -> bool {
    assert!(!channel.is_null(), "rill_chan_local_get: null channel");
    assert!(!name.is_null(), "rill_chan_local_get: null name");
    let name = unsafe { cstr_arg(name) };
    match unsafe { &*channel }.locals.get(name.as_str()) {
        Some(v) => {
            if !out.is_null() {
                unsafe { ptr::write(out, v.clone()) };
            }
            true
        }
        None => false,
    }
}

/// Write a lifted local.
///
/// # Safety
/// `channel` is the pointer passed to the body; `name` a valid C string;
/// `value` a valid `Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_chan_local_set(
    channel: *mut ValueChannel,
    name: *const c_char,
    value: *const Value,
) {
    assert!(!channel.is_null(), "rill_chan_local_set: null channel");
    assert!(!name.is_null(), "rill_chan_local_set: null name");
    assert!(!value.is_null(), "rill_chan_local_set: null value");
    let name = unsafe { cstr_arg(name) };
    unsafe { &mut *channel }
        .locals
        .set(name.as_str(), unsafe { (*value).clone() });
}

// ---------------------------------------------------------------------------
// Value slot helpers
// ---------------------------------------------------------------------------

/// Write Null into `out`.
///
/// # Safety
/// `out` must be a writable, uninitialized slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_null(out: *mut Value) {
    assert!(!out.is_null(), "rill_value_null: null out");
    unsafe { ptr::write(out, Value::Null) };
}

/// Write an integer into `out`.
///
/// # Safety
/// `out` must be a writable, uninitialized slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_int(out: *mut Value, n: i64) {
    assert!(!out.is_null(), "rill_value_int: null out");
    unsafe { ptr::write(out, Value::Int(n)) };
}

/// Write a float into `out`.
///
/// # Safety
/// `out` must be a writable, uninitialized slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_float(out: *mut Value, f: f64) {
    assert!(!out.is_null(), "rill_value_float: null out");
    unsafe { ptr::write(out, Value::Float(f)) };
}

/// Write a boolean into `out`.
///
/// # Safety
/// `out` must be a writable, uninitialized slot.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_bool(out: *mut Value, b: bool) {
    assert!(!out.is_null(), "rill_value_bool: null out");
    unsafe { ptr::write(out, Value::Bool(b)) };
}

/// Write a string (copied from a C string) into `out`.
///
/// # Safety
/// `out` must be a writable, uninitialized slot; `s` a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_str(out: *mut Value, s: *const c_char) {
    assert!(!out.is_null(), "rill_value_str: null out");
    assert!(!s.is_null(), "rill_value_str: null string");
    let s = unsafe { CStr::from_ptr(s) }.to_string_lossy();
    unsafe { ptr::write(out, Value::Str(Arc::from(s.as_ref()))) };
}

/// Clone `src` into `out`.
///
/// # Safety
/// `out` writable and uninitialized; `src` a valid `Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_clone(out: *mut Value, src: *const Value) {
    assert!(!out.is_null(), "rill_value_clone: null out");
    assert!(!src.is_null(), "rill_value_clone: null src");
    unsafe { ptr::write(out, (*src).clone()) };
}

/// Drop the value in `slot`, leaving the slot uninitialized.
///
/// # Safety
/// `slot` must hold a valid `Value` not dropped before.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rill_value_drop(slot: *mut Value) {
    assert!(!slot.is_null(), "rill_value_drop: null slot");
    unsafe { ptr::drop_in_place(slot) };
}
