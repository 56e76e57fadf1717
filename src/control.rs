//! Process liveness probing and termination signals.
//!
//! Commands talk to processes only through [`ProcessControl`], which keeps
//! the stop protocol testable without real processes.

use std::fmt;

use nix::errno::Errno;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix_control;
        use unix_control as platform;
    } else {
        compile_error!("procmanager relies on POSIX signals and only supports unix targets");
    }
}

/// Which termination request to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGTERM: the process may clean up, intercept or ignore it.
    Graceful,
    /// SIGKILL: cannot be caught.
    Forceful,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Graceful => f.write_str("SIGTERM"),
            Termination::Forceful => f.write_str("SIGKILL"),
        }
    }
}

/// Existence check and signal delivery for a single PID.
pub trait ProcessControl {
    /// True when a process with `pid` exists and may be signalled.
    ///
    /// This cannot tell a hung process from a healthy one.
    fn is_alive(&self, pid: u32) -> bool;

    /// Deliver `signal` to `pid`.
    fn signal(&self, pid: u32, signal: Termination) -> Result<(), Errno>;
}

/// [`ProcessControl`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemControl;

impl ProcessControl for SystemControl {
    fn is_alive(&self, pid: u32) -> bool {
        platform::is_alive(pid)
    }

    fn signal(&self, pid: u32, signal: Termination) -> Result<(), Errno> {
        platform::signal(pid, signal)
    }
}
