//! The four verbs, wired to the PID store, liveness check, terminator and launcher.
//!
//! Exit statuses follow the historical behaviour of the tool, including two
//! asymmetries callers rely on: `status` exits 0 after cleaning up a stale
//! PID file (but 1 when there is no file), and `stop` exits 0 when the
//! process survives SIGKILL.

use std::time::Duration;

use log::info;

use crate::cli::{LaunchArgs, RestartArgs, StatusArgs, StopArgs};
use crate::config::SupervisorConfig;
use crate::control::ProcessControl;
use crate::error::SupervisorError;
use crate::launcher::{self, LaunchConfig};
use crate::pidfile::{self, PidLock};
use crate::terminator::{POLL_INTERVAL, StopOutcome, StopRequest, Terminator};

/// Command handlers sharing one resolved configuration.
pub struct Supervisor<C> {
    config: SupervisorConfig,
    control: C,
    poll_interval: Duration,
}

impl<C: ProcessControl> Supervisor<C> {
    pub fn new(config: SupervisorConfig, control: C) -> Self {
        Self {
            config,
            control,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn terminator(&self) -> Terminator<'_, C> {
        Terminator::new(&self.control).with_poll_interval(self.poll_interval)
    }

    /// `start`: launch unless the PID file names a live process.
    pub fn start(&self, args: LaunchArgs) -> Result<(), SupervisorError> {
        let launch = self.launch_config(args);
        let lock = match &launch.pid_file {
            Some(path) => Some(PidLock::acquire(path)?),
            None => None,
        };

        if let Some(path) = &launch.pid_file
            && let Ok(pid) = pidfile::read(path)
        {
            if self.control.is_alive(pid) {
                println!("program already running, PID: {pid}");
                return Ok(());
            }
            info!("removing stale PID file {} (PID: {pid})", path.display());
            pidfile::remove(path);
        }

        self.launch(&launch, lock)
    }

    /// `stop`: terminate the recorded process.
    pub fn stop(&self, args: StopArgs) -> Result<(), SupervisorError> {
        let pid_file = self.config.require_pid_file(args.pid, "stop")?;
        let request = StopRequest {
            force: args.force,
            timeout: self.config.timeout_secs(args.timeout),
            kill_window: self.config.kill_timeout_secs,
        };

        match self.terminator().stop(&pid_file, request)? {
            StopOutcome::Stopped | StopOutcome::Killed => {}
            StopOutcome::Unresponsive { pid } => {
                // Reported, but historically not a failure exit.
                println!("{}", SupervisorError::Unresponsive { pid });
            }
        }
        Ok(())
    }

    /// `status`: report whether the recorded process is alive.
    pub fn status(&self, args: StatusArgs) -> Result<(), SupervisorError> {
        let pid_file = self.config.require_pid_file(args.pid, "status")?;
        let pid = pidfile::read(&pid_file).map_err(SupervisorError::NotRunning)?;

        if self.control.is_alive(pid) {
            println!("program running, PID: {pid}");
        } else {
            println!("program not running, but PID file exists (PID: {pid})");
            pidfile::remove(&pid_file);
        }
        Ok(())
    }

    /// `restart`: stop whatever is recorded, then start again.
    pub fn restart(&self, args: RestartArgs) -> Result<(), SupervisorError> {
        let pid_file = self.config.require_pid_file(args.launch.pid.clone(), "restart")?;
        let timeout = self.config.timeout_secs(args.timeout);
        let mut launch = self.launch_config(args.launch);
        launch.pid_file = Some(pid_file.clone());

        let lock = PidLock::acquire(&pid_file)?;
        let pre_stop = self.terminator().stop_for_restart(&pid_file, timeout)?;
        info!("pre-restart stop: {pre_stop:?}");

        println!("starting program...");
        self.launch(&launch, Some(lock))
    }

    fn launch(&self, launch: &LaunchConfig, lock: Option<PidLock>) -> Result<(), SupervisorError> {
        if launch.daemonize {
            let pid = launcher::spawn_detached(launch)?;
            drop(lock);
            println!("program started in background, PID: {pid}");
        } else {
            let status = launcher::run_foreground(launch, lock)?;
            info!("program exited with {status}");
        }
        Ok(())
    }

    fn launch_config(&self, args: LaunchArgs) -> LaunchConfig {
        LaunchConfig {
            program: args.program,
            args: args.args,
            daemonize: args.daemon,
            log_file: self.config.log_file(args.log),
            pid_file: self.config.pid_file(args.pid),
        }
    }
}
