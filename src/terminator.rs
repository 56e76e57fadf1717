//! Graceful-then-forceful termination of the tracked process.
//!
//! ```text
//! Running ─SIGTERM─▶ SignaledGraceful ─dead─▶ ConfirmedStopped
//!                          │ timeout
//!                          ▼
//!                    SignaledForceful ─dead─▶ ConfirmedStopped
//!                          │ window elapsed
//!                          ▼
//!                     Unresponsive
//! ```
//!
//! Every poll sleeps one interval and then checks liveness; the first dead
//! check ends the wait. Confirmed stops always remove the PID file, an
//! unresponsive process keeps it for manual inspection.

use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::control::{ProcessControl, Termination};
use crate::error::SupervisorError;
use crate::pidfile;

/// Interval between liveness checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Parameters of a `stop` invocation. Counts are in poll intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRequest {
    /// Skip SIGTERM and go straight to SIGKILL.
    pub force: bool,
    pub timeout: u64,
    pub kill_window: u64,
}

/// How a termination attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited after SIGTERM.
    Stopped,
    /// Exited after SIGKILL.
    Killed,
    /// Still alive after SIGKILL.
    Unresponsive { pid: u32 },
}

/// What restart's pre-stop phase found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreStop {
    /// Nothing usable was recorded, or the recorded process was already gone.
    NotRunning,
    Stopped,
    Killed,
}

pub struct Terminator<'a, C: ProcessControl + ?Sized> {
    control: &'a C,
    poll_interval: Duration,
}

impl<'a, C: ProcessControl + ?Sized> Terminator<'a, C> {
    pub fn new(control: &'a C) -> Self {
        Self {
            control,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The `stop` protocol.
    ///
    /// Fails when no PID is recorded or a signal cannot be delivered. An
    /// unresponsive process is an `Ok` outcome.
    pub fn stop(&self, pid_file: &Path, request: StopRequest) -> Result<StopOutcome, SupervisorError> {
        let pid = pidfile::read(pid_file).map_err(SupervisorError::NotRunning)?;

        if !request.force {
            println!("stopping process (PID: {pid})...");
            self.send(pid, Termination::Graceful)?;
            if self.wait_for_exit(pid, request.timeout) {
                println!("program stopped");
                pidfile::remove(pid_file);
                return Ok(StopOutcome::Stopped);
            }
            println!(
                "program did not stop within {}s, forcing termination...",
                request.timeout
            );
        }

        println!("killing process (PID: {pid})...");
        warn_kill_not_relayed(pid);
        self.send(pid, Termination::Forceful)?;
        if self.wait_for_exit(pid, request.kill_window) {
            println!("program killed");
            pidfile::remove(pid_file);
            return Ok(StopOutcome::Killed);
        }

        warn!("process {pid} survived SIGKILL; leaving {} in place", pid_file.display());
        Ok(StopOutcome::Unresponsive { pid })
    }

    /// The stop phase of `restart`.
    ///
    /// Missing, malformed and stale records all count as "not running", as
    /// does a SIGTERM that cannot be delivered. SIGKILL is folded into the
    /// same timeout: after the last graceful poll it gets one more poll, and
    /// a survivor is an error.
    pub fn stop_for_restart(&self, pid_file: &Path, timeout: u64) -> Result<PreStop, SupervisorError> {
        let pid = match pidfile::read(pid_file) {
            Ok(pid) => pid,
            Err(e) => {
                debug!("nothing to stop before restart: {e}");
                return Ok(PreStop::NotRunning);
            }
        };
        if !self.control.is_alive(pid) {
            info!("removing stale PID file {} (PID: {pid})", pid_file.display());
            pidfile::remove(pid_file);
            return Ok(PreStop::NotRunning);
        }

        println!("stopping process (PID: {pid})...");
        if let Err(e) = self.send(pid, Termination::Graceful) {
            println!("{e}, treating it as not running");
            return Ok(PreStop::NotRunning);
        }
        if self.wait_for_exit(pid, timeout) {
            println!("program stopped");
            pidfile::remove(pid_file);
            return Ok(PreStop::Stopped);
        }

        println!("program did not stop within {timeout}s, forcing termination...");
        warn_kill_not_relayed(pid);
        if let Err(e) = self.send(pid, Termination::Forceful) {
            warn!("{e}");
        }
        if self.wait_for_exit(pid, 1) {
            println!("program killed");
            pidfile::remove(pid_file);
            return Ok(PreStop::Killed);
        }
        Err(SupervisorError::Unresponsive { pid })
    }

    fn send(&self, pid: u32, signal: Termination) -> Result<(), SupervisorError> {
        debug!("sending {signal} to {pid}");
        self.control
            .signal(pid, signal)
            .map_err(|source| SupervisorError::Signal { pid, signal, source })
    }

    /// Poll up to `polls` times; true as soon as the process is gone.
    fn wait_for_exit(&self, pid: u32, polls: u64) -> bool {
        for tick in 1..=polls {
            thread::sleep(self.poll_interval);
            if !self.control.is_alive(pid) {
                debug!("process {pid} gone after {tick} poll(s)");
                return true;
            }
        }
        false
    }
}

/// SIGKILL cannot be caught, so a detached supervisor dies without relaying
/// it and the program it hosts keeps running.
fn warn_kill_not_relayed(pid: u32) {
    warn!(
        "SIGKILL only reaches process {pid}; if it is a daemon's supervisor, \
         the program it started may still be running"
    );
}
