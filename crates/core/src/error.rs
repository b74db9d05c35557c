//! Runtime Error Handling
//!
//! The Rill FFI surface never unwinds: a protocol violation or body fault
//! detected inside an `extern "C"` entry point is parked in a thread-local
//! cell instead of panicking across the ABI. Compiled code polls the cell
//! after any operation that can fail.
//!
//! ```ignore
//! if gen.get_return().is_err() {
//!     set_runtime_error("getReturn: generator has not returned");
//!     return;
//! }
//! ```
//!
//! Checking from compiled code:
//! ```ignore
//! if rill_has_error() {
//!     let msg = rill_take_error(); // copy immediately
//! }
//! ```

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

thread_local! {
    /// Last runtime error reported on this thread
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };

    /// Backing storage for pointers handed across the FFI; keeping the
    /// CString alive here is what makes the returned pointer valid.
    static ERROR_CSTRING: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last runtime error message.
///
/// Clears any cached CString so no stale pointer can be observed.
pub fn set_runtime_error(msg: impl Into<String>) {
    ERROR_CSTRING.with(|cs| *cs.borrow_mut() = None);
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg.into()));
}

/// Take (and clear) the last runtime error message.
pub fn take_runtime_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Check whether a runtime error is pending.
pub fn has_runtime_error() -> bool {
    LAST_ERROR.with(|e| e.borrow().is_some())
}

/// Clear any pending runtime error.
pub fn clear_runtime_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
    ERROR_CSTRING.with(|e| *e.borrow_mut() = None);
}

/// Cache `msg` as a CString and return a pointer into the cache.
///
/// Null bytes are replaced with '?' so the conversion cannot fail.
fn cache_cstring(msg: &str) -> *const c_char {
    let safe: String = msg.chars().map(|c| if c == '\0' { '?' } else { c }).collect();
    let cstring = CString::new(safe).expect("null bytes already replaced");
    ERROR_CSTRING.with(|cs| {
        let ptr = cstring.as_ptr();
        *cs.borrow_mut() = Some(cstring);
        ptr
    })
}

// FFI-safe error access

/// Check whether a runtime error is pending (FFI-safe).
#[unsafe(no_mangle)]
pub extern "C" fn rill_has_error() -> bool {
    has_runtime_error()
}

/// Get the pending error message without clearing it (FFI-safe).
///
/// Returns null if no error is pending.
///
/// # Pointer Lifetime
/// The returned pointer is only valid until the next call into this module.
/// Callers must copy the string immediately if they need to retain it.
#[unsafe(no_mangle)]
pub extern "C" fn rill_get_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(msg) => cache_cstring(msg),
        None => ptr::null(),
    })
}

/// Take (and clear) the pending error as a C string (FFI-safe).
///
/// Returns null if no error is pending. Same pointer-lifetime rules as
/// [`rill_get_error`].
#[unsafe(no_mangle)]
pub extern "C" fn rill_take_error() -> *const c_char {
    match take_runtime_error() {
        Some(msg) => cache_cstring(&msg),
        None => ptr::null(),
    }
}

/// Clear any pending error (FFI-safe).
#[unsafe(no_mangle)]
pub extern "C" fn rill_clear_error() {
    clear_runtime_error();
}
