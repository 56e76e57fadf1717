//! procmanager: start, stop, restart and inspect a single program tracked
//! through a PID file.

pub mod cli;
pub mod commands;
pub mod config;
pub mod control;
pub mod error;
pub mod launcher;
pub mod pidfile;
pub mod signals;
pub mod terminator;

pub use commands::Supervisor;
pub use config::SupervisorConfig;
pub use control::{ProcessControl, SystemControl, Termination};
pub use error::SupervisorError;
