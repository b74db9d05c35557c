//! Runtime diagnostics for production debugging
//!
//! Provides a SIGQUIT (kill -3) handler that dumps generator statistics to
//! stderr, similar to JVM thread dumps: how many generators are live, what
//! state each is in, and how often each has been advanced. Useful for
//! spotting generators a host forgot to drive or release.
//!
//! ## Usage
//!
//! ```bash
//! kill -3 <pid>
//! ```
//!
//! The process dumps diagnostics to stderr and continues running.
//!
//! ## Signal Safety
//!
//! `dump_diagnostics()` does I/O and takes locks, which is not
//! async-signal-safe. A dedicated thread waits on signal-hook's iterator
//! API instead, so all I/O happens on an ordinary thread.

#![cfg(feature = "diagnostics")]

use crate::generator::{
    ACTIVE_GENERATORS, PEAK_GENERATORS, TOTAL_CLOSED, TOTAL_CREATED, TOTAL_FAULTS_INJECTED,
    TOTAL_SENDS, TOTAL_YIELDS,
};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Mutex, Once, OnceLock};

static SIGNAL_HANDLER_INIT: Once = Once::new();
static GENERATOR_REGISTRY: OnceLock<GeneratorRegistry> = OnceLock::new();

/// Maximum number of individual generators shown in the dump, to keep the
/// output readable for hosts with many live generators
const GENERATOR_DISPLAY_LIMIT: usize = 20;

/// Snapshot of one live generator.
#[derive(Debug, Clone)]
pub struct GeneratorEntry {
    pub id: u64,
    pub state: &'static str,
    pub advancements: u64,
}

/// Registry of live generators, updated on creation, every state
/// transition, and release.
#[derive(Debug, Default)]
pub struct GeneratorRegistry {
    entries: Mutex<HashMap<u64, GeneratorEntry>>,
}

impl GeneratorRegistry {
    pub fn register(&self, id: u64) {
        let mut entries = self.entries.lock().expect("generator registry poisoned");
        entries.insert(
            id,
            GeneratorEntry {
                id,
                state: "not-started",
                advancements: 0,
            },
        );
    }

    pub fn note(&self, id: u64, state: &'static str, advancements: u64) {
        let mut entries = self.entries.lock().expect("generator registry poisoned");
        if let Some(entry) = entries.get_mut(&id) {
            entry.state = state;
            entry.advancements = advancements;
        }
    }

    pub fn unregister(&self, id: u64) {
        let mut entries = self.entries.lock().expect("generator registry poisoned");
        entries.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("generator registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<GeneratorEntry> {
        let entries = self.entries.lock().expect("generator registry poisoned");
        let mut list: Vec<GeneratorEntry> = entries.values().cloned().collect();
        list.sort_by_key(|e| e.id);
        list
    }
}

/// The process-wide registry.
pub fn generator_registry() -> &'static GeneratorRegistry {
    GENERATOR_REGISTRY.get_or_init(GeneratorRegistry::default)
}

/// Install the SIGQUIT handler. Idempotent; compiled main prologues call it
/// through `rill_diagnostics_init`.
pub fn install_signal_handler() {
    SIGNAL_HANDLER_INIT.call_once(|| {
        #[cfg(unix)]
        {
            use signal_hook::consts::SIGQUIT;
            use signal_hook::iterator::Signals;

            let mut signals = match Signals::new([SIGQUIT]) {
                Ok(s) => s,
                Err(_) => return, // Silently fail if we can't register
            };

            std::thread::Builder::new()
                .name("rill-diagnostics".to_string())
                .spawn(move || {
                    for sig in signals.forever() {
                        if sig == SIGQUIT {
                            dump_diagnostics();
                        }
                    }
                })
                .ok();
        }

        #[cfg(not(unix))]
        {
            // No signal support; dump_diagnostics() can still be called
            // directly.
        }
    });
}

/// Dump generator diagnostics to stderr.
///
/// Callable directly or triggered via SIGQUIT. Output goes to stderr to
/// stay out of program output.
pub fn dump_diagnostics() {
    use std::io::Write;

    let mut out = std::io::stderr().lock();

    let _ = writeln!(out, "\n=== Rill Runtime Diagnostics ===");
    let _ = writeln!(out, "Timestamp: {:?}", std::time::SystemTime::now());

    let _ = writeln!(out, "\n[Generators]");
    let _ = writeln!(
        out,
        "  active: {}  peak: {}  created: {}  closed: {}",
        ACTIVE_GENERATORS.load(Ordering::Relaxed),
        PEAK_GENERATORS.load(Ordering::Relaxed),
        TOTAL_CREATED.load(Ordering::Relaxed),
        TOTAL_CLOSED.load(Ordering::Relaxed),
    );
    let _ = writeln!(
        out,
        "  yields: {}  sends: {}  faults injected: {}",
        TOTAL_YIELDS.load(Ordering::Relaxed),
        TOTAL_SENDS.load(Ordering::Relaxed),
        TOTAL_FAULTS_INJECTED.load(Ordering::Relaxed),
    );

    let live = generator_registry().snapshot();
    for entry in live.iter().take(GENERATOR_DISPLAY_LIMIT) {
        let _ = writeln!(
            out,
            "  #{:<6} {:<12} advancements: {}",
            entry.id, entry.state, entry.advancements
        );
    }
    if live.len() > GENERATOR_DISPLAY_LIMIT {
        let _ = writeln!(out, "  ... and {} more", live.len() - GENERATOR_DISPLAY_LIMIT);
    }

    let _ = writeln!(out, "=== End Diagnostics ===\n");
}

/// Install the handler (FFI-safe entry point for compiled main prologues).
#[unsafe(no_mangle)]
pub extern "C" fn rill_diagnostics_init() {
    install_signal_handler();
}

/// Dump diagnostics now (FFI-safe).
#[unsafe(no_mangle)]
pub extern "C" fn rill_diagnostics_dump() {
    dump_diagnostics();
}
