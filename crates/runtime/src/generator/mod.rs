//! Generator engine: cooperative, synchronously driven resumable bodies
//!
//! A Rill generator pairs a compiled state-machine body with a
//! [`ValueChannel`]. "Suspension" is simulated entirely through call/return:
//! the driver calls the body once per advancement, the body runs from its
//! saved resume point until it writes a yield, a return, or a fault into the
//! channel, and returns. There is no green thread, no stack switch, and no
//! background execution; consumer and body share one logical thread of
//! control.
//!
//! ## Lifecycle
//!
//! ```text
//! NotStarted --advance--> Suspended --advance--> Suspended | Closed
//!                     \--advance--> Closed
//! ```
//!
//! `Running` is only ever observable from inside the body itself (via the
//! generator handle it is passed); by the time any consumer operation
//! returns, the generator is `Suspended` or `Closed`.
//!
//! ## Driving a generator
//!
//! Consumers use the protocol surface `rewind` / `valid` / `current` /
//! `key` / `next` / `send` / `throw` / `get_return`. Every operation except
//! `get_return` lazily performs the first advancement, so e.g. `valid()` on
//! a fresh generator can surface a fault raised by the body's very first
//! step.

pub mod channel;
pub mod ffi;
pub mod keys;

use crate::context::EvalContext;
use channel::{BodyFault, ValueChannel};
use keys::KeyAllocator;
use rill_core::Value;
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Signature of a lowered generator body.
///
/// The compiler emits one such function per generator source function. The
/// body communicates exclusively through `channel`; `ctx` and `receiver` are
/// pass-through values bound at construction and never interpreted by the
/// driver. `handle` identifies the generator to the body (diagnostics,
/// nested driving) and must not be used to re-enter the driver during the
/// call.
pub type GeneratorBody = unsafe extern "C" fn(
    ctx: *mut EvalContext,
    receiver: *const Value,
    channel: *mut ValueChannel,
    handle: *mut Generator,
);

// Global generator statistics. Always maintained (they are plain atomic
// increments); the diagnostics feature adds the registry and SIGQUIT dump
// on top, and the report module summarizes them at exit.
pub static ACTIVE_GENERATORS: AtomicUsize = AtomicUsize::new(0);
pub static PEAK_GENERATORS: AtomicUsize = AtomicUsize::new(0);
pub static TOTAL_CREATED: AtomicU64 = AtomicU64::new(0);
pub static TOTAL_CLOSED: AtomicU64 = AtomicU64::new(0);
pub static TOTAL_YIELDS: AtomicU64 = AtomicU64::new(0);
pub static TOTAL_SENDS: AtomicU64 = AtomicU64::new(0);
pub static TOTAL_FAULTS_INJECTED: AtomicU64 = AtomicU64::new(0);

static NEXT_GENERATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Externally observable lifecycle state.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    NotStarted = 0,
    Running = 1,
    Suspended = 2,
    Closed = 3,
}

impl GeneratorState {
    pub fn name(self) -> &'static str {
        match self {
            GeneratorState::NotStarted => "not-started",
            GeneratorState::Running => "running",
            GeneratorState::Suspended => "suspended",
            GeneratorState::Closed => "closed",
        }
    }
}

/// Errors surfaced by the consumer protocol.
#[derive(Debug)]
pub enum GeneratorError {
    /// `rewind()` after the generator progressed beyond its first yield
    AlreadyRun,
    /// `get_return()` before the body has returned
    NoReturnYet,
    /// Attempt to serialize or unserialize a generator
    NotSerializable,
    /// Fault raised by the body (or re-raised by `throw()` on a dead
    /// generator), passed through unchanged
    Fault(BodyFault),
}

impl std::fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorError::AlreadyRun => {
                write!(f, "Cannot rewind a generator that was already run")
            }
            GeneratorError::NoReturnYet => {
                write!(f, "Cannot get return value of a generator that hasn't returned")
            }
            GeneratorError::NotSerializable => {
                write!(f, "Serialization of 'Generator' is not allowed")
            }
            GeneratorError::Fault(fault) => write!(f, "{}", fault),
        }
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeneratorError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// One generator invocation.
///
/// Holds the lifecycle state, the shared channel, the auto-key counter, and
/// the immutable construction bindings (context, receiver, body). Not
/// `Send`: a generator belongs to the logical thread that created it, and
/// concurrent driving is a caller obligation the runtime does not police
/// with locks.
pub struct Generator {
    id: u64,
    state: GeneratorState,
    channel: ValueChannel,
    keys: KeyAllocator,
    has_started: bool,
    past_first_yield: bool,
    returned: bool,
    advancements: u64,
    ctx: *mut EvalContext,
    receiver: Option<Value>,
    body: GeneratorBody,
}

impl Generator {
    /// Bind a new generator to a lowered body.
    ///
    /// # Safety
    /// `body` must follow the [`GeneratorBody`] contract, and `ctx` must
    /// remain valid for as long as the body can still be advanced. The
    /// driver itself never dereferences `ctx`; it is handed to the body on
    /// every call.
    pub unsafe fn new(
        ctx: *mut EvalContext,
        receiver: Option<Value>,
        body: GeneratorBody,
    ) -> Generator {
        let id = NEXT_GENERATOR_ID.fetch_add(1, Ordering::Relaxed);
        TOTAL_CREATED.fetch_add(1, Ordering::Relaxed);
        let active = ACTIVE_GENERATORS.fetch_add(1, Ordering::AcqRel) + 1;
        PEAK_GENERATORS.fetch_max(active, Ordering::AcqRel);

        let generator = Generator {
            id,
            state: GeneratorState::NotStarted,
            channel: ValueChannel::new(),
            keys: KeyAllocator::new(),
            has_started: false,
            past_first_yield: false,
            returned: false,
            advancements: 0,
            ctx,
            receiver,
            body,
        };

        #[cfg(feature = "diagnostics")]
        crate::diagnostics::generator_registry().register(id);

        generator
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Perform one advancement: run the body from its saved resume point to
    /// its next yield, completion, or fault.
    ///
    /// No-op when the generator is already closed.
    pub fn advance(&mut self) -> Result<(), GeneratorError> {
        if self.state == GeneratorState::Closed {
            return Ok(());
        }

        // Anything after the first-ever advancement forecloses rewind.
        if self.has_started {
            self.past_first_yield = true;
        }

        self.state = GeneratorState::Running;
        self.channel.user_key_set = false;
        self.advancements += 1;

        let body = self.body;
        let ctx = self.ctx;
        // Every raw pointer handed to the body derives from the handle, so
        // the body may freely mix channel access with handle access.
        let handle: *mut Generator = self;
        unsafe {
            let receiver_ptr = (*handle)
                .receiver
                .as_ref()
                .map_or(ptr::null(), |v| v as *const Value);
            let channel_ptr: *mut ValueChannel = &raw mut (*handle).channel;
            body(ctx, receiver_ptr, channel_ptr, handle);
        }

        self.has_started = true;

        let result = if let Some(fault) = self.channel.fault_out.take() {
            // A body fault kills the generator; it is not resumable.
            self.close();
            Err(GeneratorError::Fault(fault))
        } else if self.channel.finished {
            self.returned = true;
            self.close();
            Ok(())
        } else {
            if !self.channel.user_key_set {
                self.channel.current_key = self.keys.next_key();
            }
            self.keys.observe(&self.channel.current_key);
            TOTAL_YIELDS.fetch_add(1, Ordering::Relaxed);
            self.state = GeneratorState::Suspended;
            Ok(())
        };

        self.note_state();
        result
    }

    /// Ensure the generator has executed to its first suspension (or
    /// completion), rewinding nothing.
    pub fn rewind(&mut self) -> Result<(), GeneratorError> {
        self.ensure_started()?;
        if self.past_first_yield {
            return Err(GeneratorError::AlreadyRun);
        }
        Ok(())
    }

    /// True iff the generator is suspended at a yield.
    pub fn valid(&mut self) -> Result<bool, GeneratorError> {
        self.ensure_started()?;
        Ok(self.state == GeneratorState::Suspended)
    }

    /// The current yielded value. Retains its last-written content after the
    /// generator closes.
    pub fn current(&mut self) -> Result<Value, GeneratorError> {
        self.ensure_started()?;
        Ok(self.channel.current_value.clone())
    }

    /// The current key (explicit or auto-assigned).
    pub fn key(&mut self) -> Result<Value, GeneratorError> {
        self.ensure_started()?;
        Ok(self.channel.current_key.clone())
    }

    /// Move to the next yield. Silent no-op once closed.
    pub fn next(&mut self) -> Result<(), GeneratorError> {
        self.ensure_started()?;
        self.advance()
    }

    /// Send a value into the generator and move to its next yield.
    ///
    /// The value is staged only after the generator has run to its first
    /// suspension, so a send on a fresh generator is consumed by the
    /// resumption *after* the first yield, never by the advancement that
    /// produces it.
    pub fn send(&mut self, value: Value) -> Result<Value, GeneratorError> {
        self.ensure_started()?;
        TOTAL_SENDS.fetch_add(1, Ordering::Relaxed);
        self.channel.sent = Some(value);
        let result = self.advance();
        self.channel.sent = None;
        result?;
        self.current()
    }

    /// Throw a fault into the generator at its current suspension point.
    ///
    /// If the generator is not suspended (never became valid, or already
    /// closed), the fault is re-raised directly to the caller without
    /// invoking the body.
    pub fn throw(&mut self, fault: BodyFault) -> Result<Value, GeneratorError> {
        if !self.valid()? {
            return Err(GeneratorError::Fault(fault));
        }
        TOTAL_FAULTS_INJECTED.fetch_add(1, Ordering::Relaxed);
        self.channel.fault_in = Some(fault);
        let result = self.advance();
        self.channel.fault_in = None;
        result?;
        self.current()
    }

    /// The terminal return value, available once the body has returned.
    /// Repeatable; never forces an advancement.
    pub fn get_return(&self) -> Result<Value, GeneratorError> {
        if !self.returned {
            return Err(GeneratorError::NoReturnYet);
        }
        Ok(self.channel.return_value.clone())
    }

    /// Serialization gate: generators are live execution state, not data.
    pub fn wakeup(&self) -> Result<(), GeneratorError> {
        Err(GeneratorError::NotSerializable)
    }

    /// The shared channel, for bodies driven through safe Rust (tests, host
    /// embedding). Compiled code receives the same pointer as an argument.
    pub fn channel_mut(&mut self) -> &mut ValueChannel {
        &mut self.channel
    }

    fn ensure_started(&mut self) -> Result<(), GeneratorError> {
        if !self.has_started {
            self.advance()?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.state = GeneratorState::Closed;
        TOTAL_CLOSED.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(feature = "diagnostics")]
    fn note_state(&self) {
        crate::diagnostics::generator_registry().note(self.id, self.state.name(), self.advancements);
    }

    #[cfg(not(feature = "diagnostics"))]
    fn note_state(&self) {}
}

impl Drop for Generator {
    fn drop(&mut self) {
        // Releasing a generator never resumes the body: whatever cleanup
        // logic sits inside the body at its suspension point is not run.
        ACTIVE_GENERATORS.fetch_sub(1, Ordering::AcqRel);

        #[cfg(feature = "diagnostics")]
        crate::diagnostics::generator_registry().unregister(self.id);
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("has_started", &self.has_started)
            .field("past_first_yield", &self.past_first_yield)
            .field("returned", &self.returned)
            .field("advancements", &self.advancements)
            .finish()
    }
}
