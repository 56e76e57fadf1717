use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "procmanager",
    version,
    about = "Manage the lifecycle of a program through a PID file",
    long_about = "procmanager starts a program (optionally as a daemon), records its PID,\n\
                  and can report on, stop or restart it later using that PID file."
)]
pub struct Args {
    /// Configuration file with defaults for --pid, --log and --timeout
    #[arg(long, short = 'c', global = true, conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Ignore configuration files entirely
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Increase diagnostic output on stderr (-v, -vv, -vvv)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Start a program (arguments starting with '-' go after `--`)
    Start(LaunchArgs),
    /// Stop the program recorded in the PID file
    ///
    /// For a daemon the PID file names its detached supervisor, which relays
    /// SIGTERM to the program.
    /// SIGKILL reaches only that supervisor (after the timeout, or with --force),
    /// so a program that ignores SIGTERM can be left running untracked.
    Stop(StopArgs),
    /// Show whether the recorded program is running (Exit 0 = running or stale record cleaned up)
    Status(StatusArgs),
    /// Stop the recorded program if it is running, then start it again
    Restart(RestartArgs),
}

#[derive(ClapArgs, Debug)]
pub struct LaunchArgs {
    /// Program to run
    pub program: PathBuf,

    /// Arguments passed to the program
    pub args: Vec<OsString>,

    /// Run detached from the terminal in a new session
    #[arg(long, short = 'd')]
    pub daemon: bool,

    /// Append the program's stdout and stderr to this file
    #[arg(long, short = 'l')]
    pub log: Option<PathBuf>,

    /// Record the PID in this file
    #[arg(long, short = 'p')]
    pub pid: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct StopArgs {
    /// PID file of the program to stop
    #[arg(long, short = 'p')]
    pub pid: Option<PathBuf>,

    /// Send SIGKILL right away instead of SIGTERM (not relayed by a daemon's supervisor)
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Seconds to wait for SIGTERM before escalating [default: 10]
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct StatusArgs {
    /// PID file of the program to inspect
    #[arg(long, short = 'p')]
    pub pid: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct RestartArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Seconds to wait for SIGTERM before escalating [default: 10]
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}
