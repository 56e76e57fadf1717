//! Error surface shared by every supervisor command.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::config::ConfigError;
use crate::control::Termination;
use crate::pidfile::PidFileError;

/// Everything that can make a supervisor invocation fail.
///
/// All variants map to exit status 1; see [`crate::commands`] for the two
/// user-visible outcomes that are reported but still exit 0.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    PidFile(#[from] PidFileError),

    #[error("program not running")]
    NotRunning(#[source] PidFileError),

    #[error("failed to open log file {}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open the null device")]
    NullDevice(#[source] io::Error),

    #[error("failed to locate the procmanager executable")]
    CurrentExe(#[source] io::Error),

    #[error("failed to start {}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for process {pid}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to send {signal} to process {pid}")]
    Signal {
        pid: u32,
        signal: Termination,
        #[source]
        source: Errno,
    },

    #[error("unable to terminate program (PID: {pid}), check it manually")]
    Unresponsive { pid: u32 },
}
