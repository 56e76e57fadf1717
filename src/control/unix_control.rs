//! POSIX liveness check and signal delivery via `kill(2)`

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use super::Termination;

/// Check with signal 0. EPERM counts as "not alive" as well: a process we
/// may not signal is not one we can manage.
pub fn is_alive(pid: u32) -> bool {
    match to_pid(pid) {
        Ok(pid) => kill(pid, None).is_ok(),
        Err(_) => false,
    }
}

pub fn signal(pid: u32, termination: Termination) -> Result<(), Errno> {
    let signal = match termination {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forceful => Signal::SIGKILL,
    };
    kill(to_pid(pid)?, signal)
}

/// Reject 0 and values outside `pid_t`; both would address process groups.
fn to_pid(pid: u32) -> Result<Pid, Errno> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(Errno::ESRCH),
    }
}
