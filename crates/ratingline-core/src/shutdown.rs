//! Cooperative stop between pages
//!
//! Signals only raise a process-wide flag. Loops poll it at safe points
//! (before each page, before each detail fetch) and unwind with their state
//! checkpointed.

use std::sync::atomic::{AtomicBool, Ordering};

/// Raised by the first SIGINT/SIGTERM
static STOP: AtomicBool = AtomicBool::new(false);

pub fn is_shutdown_requested() -> bool {
    STOP.load(Ordering::Relaxed)
}

/// Same effect as receiving a signal
pub fn request_shutdown() {
    STOP.store(true, Ordering::Relaxed);
}

/// Lower the flag again, so a later run in the same process starts clean
pub fn clear_shutdown() {
    STOP.store(false, Ordering::Relaxed);
}

/// Route SIGINT and SIGTERM to the flag. A second signal exits with 130.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // SAFETY: the handler only touches an atomic and calls `exit`.
        unsafe {
            signal_hook::low_level::register(signal, || {
                if STOP.swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            })?;
        }
    }
    Ok(())
}
