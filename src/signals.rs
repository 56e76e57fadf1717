//! Relay termination requests from the supervisor to its foreground child.
//!
//! A daemonized program runs under a re-invoked supervisor, and the PID file
//! names that supervisor. `stop` therefore signals the supervisor, which must
//! pass SIGTERM/SIGHUP on instead of dying and orphaning the program.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

// Polling-based handling: the handler only stores the number.
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

const RELAYED: [Signal; 2] = [Signal::SIGTERM, Signal::SIGHUP];

extern "C" fn record(sig: i32) {
    PENDING_SIGNAL.store(sig, Ordering::SeqCst);
}

/// Route SIGTERM and SIGHUP into [`take_pending`] instead of the default
/// disposition.
pub fn install_relay_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(record),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in RELAYED {
        // SAFETY: `record` only performs an atomic store, which is
        // async-signal-safe.
        unsafe { signal::sigaction(sig, &action) }?;
    }
    Ok(())
}

/// Non-blocking; returns each received signal once.
pub fn take_pending() -> Option<Signal> {
    match PENDING_SIGNAL.swap(0, Ordering::AcqRel) {
        0 => None,
        raw => match Signal::try_from(raw) {
            Ok(sig) => Some(sig),
            Err(e) => {
                log::error!("BUG: handler recorded invalid signal number {raw}: {e}");
                None
            }
        },
    }
}

/// Forward `sig` to the child.
pub fn relay(child: u32, sig: Signal) {
    let Ok(raw) = i32::try_from(child) else {
        return;
    };
    match signal::kill(Pid::from_raw(raw), sig) {
        Ok(()) => log::info!("relayed {sig} to child {child}"),
        Err(e) => log::warn!("failed to relay {sig} to child {child}: {e}"),
    }
}

