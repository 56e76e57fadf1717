//! Spawning the supervised program.
//!
//! Foreground launches wait for the child and clean up its PID file when it
//! exits. Detached launches re-run this executable's `start` verb in a new
//! session and return immediately; that re-invoked supervisor is what the
//! PID file records.

use std::env;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::SupervisorError;
use crate::pidfile::{self, PidLock};
use crate::signals;

/// How often a foreground supervisor checks on its child.
const CHILD_POLL: Duration = Duration::from_millis(100);

const NULL_DEVICE: &str = "/dev/null";

/// What to run and where to record it. Fixed once a launch begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub daemonize: bool,
    pub log_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
}

/// Run the program attached to this terminal and block until it exits.
///
/// `lock` is released once the PID has been recorded.
pub fn run_foreground(
    config: &LaunchConfig,
    lock: Option<PidLock>,
) -> Result<ExitStatus, SupervisorError> {
    if let Err(e) = signals::install_relay_handlers() {
        warn!("signals will not be relayed to the child: {e}");
    }

    let mut child = {
        let mut command = Command::new(&config.program);
        command.args(&config.args).stdin(Stdio::inherit());
        if let Some(path) = &config.log_file {
            let (stdout, stderr) = log_pair(path)?;
            command.stdout(stdout).stderr(stderr);
        }
        command.spawn().map_err(|source| SupervisorError::Spawn {
            program: config.program.clone(),
            source,
        })?
    };
    let pid = child.id();
    info!("spawned {} as pid {pid}", config.program.display());

    if let Some(path) = &config.pid_file
        && let Err(e) = pidfile::write(path, pid)
    {
        // An untracked child would be unreachable for stop/status.
        if let Err(kill_err) = child.kill() {
            warn!("failed to kill untracked child {pid}: {kill_err}");
        }
        if let Err(wait_err) = child.wait() {
            warn!("failed to reap untracked child {pid}: {wait_err}");
        }
        return Err(e.into());
    }
    drop(lock);

    println!("program started, PID: {pid}");

    let waited = wait_relaying(&mut child);
    if let Some(path) = &config.pid_file {
        pidfile::remove(path);
    }
    let status = waited?;
    if status.success() {
        debug!("child {pid} exited cleanly");
    } else {
        println!("program exited abnormally: {status}");
    }
    Ok(status)
}

/// Start a detached supervisor for the program and return its PID.
pub fn spawn_detached(config: &LaunchConfig) -> Result<u32, SupervisorError> {
    let exe = env::current_exe().map_err(SupervisorError::CurrentExe)?;

    let null = open_null()?;
    let (stdout, stderr) = match &config.log_file {
        Some(path) => log_pair(path)?,
        None => (
            null.try_clone().map_err(SupervisorError::NullDevice)?,
            null.try_clone().map_err(SupervisorError::NullDevice)?,
        ),
    };

    let mut command = Command::new(&exe);
    command
        .args(reinvocation_args(config))
        .stdin(null)
        .stdout(stdout)
        .stderr(stderr);
    // SAFETY: setsid(2) is async-signal-safe and touches no parent state.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(drop)
                .map_err(io::Error::from)
        });
    }

    let child = command.spawn().map_err(|source| SupervisorError::Spawn {
        program: exe.clone(),
        source,
    })?;
    let pid = child.id();
    info!("detached supervisor for {} is pid {pid}", config.program.display());

    if let Some(path) = &config.pid_file {
        pidfile::write(path, pid)?;
    }
    Ok(pid)
}

/// Arguments for the detached re-invocation.
///
/// Only the program and its arguments are carried over: the daemon flag
/// would recurse, and the PID and log files belong to the invoking
/// supervisor.
pub fn reinvocation_args(config: &LaunchConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["start", "--no-config", "--"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(config.program.clone().into_os_string());
    args.extend(config.args.iter().cloned());
    args
}

fn wait_relaying(child: &mut Child) -> Result<ExitStatus, SupervisorError> {
    let pid = child.id();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(source) => return Err(SupervisorError::Wait { pid, source }),
        }
        if let Some(sig) = signals::take_pending() {
            signals::relay(pid, sig);
        }
        thread::sleep(CHILD_POLL);
    }
}

/// stdout and stderr handles for the same append-mode log file.
fn log_pair(path: &Path) -> Result<(File, File), SupervisorError> {
    let wrap = |source: io::Error| SupervisorError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(wrap)?;
    let stderr = stdout.try_clone().map_err(wrap)?;
    Ok((stdout, stderr))
}

fn open_null() -> Result<File, SupervisorError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(NULL_DEVICE)
        .map_err(SupervisorError::NullDevice)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn config(program: &str, args: &[&str]) -> LaunchConfig {
        LaunchConfig {
            program: PathBuf::from(program),
            args: args.iter().map(OsString::from).collect(),
            daemonize: false,
            log_file: None,
            pid_file: None,
        }
    }

    #[test]
    fn reinvocation_drops_daemon_pid_and_log_flags() {
        let mut cfg = config("/usr/bin/server", &["--port", "80", "-d"]);
        cfg.daemonize = true;
        cfg.log_file = Some(PathBuf::from("/tmp/server.log"));
        cfg.pid_file = Some(PathBuf::from("/tmp/server.pid"));

        let args = reinvocation_args(&cfg);

        let expected: Vec<OsString> = [
            "start",
            "--no-config",
            "--",
            "/usr/bin/server",
            "--port",
            "80",
            "-d",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn foreground_removes_pid_file_after_exit() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("run").join("true.pid");
        let mut cfg = config("true", &[]);
        cfg.pid_file = Some(pid_path.clone());

        let status = run_foreground(&cfg, None).unwrap();

        assert!(status.success());
        assert!(!pid_path.exists());
    }

    #[test]
    fn foreground_failure_still_removes_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("false.pid");
        let mut cfg = config("false", &[]);
        cfg.pid_file = Some(pid_path.clone());

        let status = run_foreground(&cfg, None).unwrap();

        assert!(!status.success());
        assert!(!pid_path.exists());
    }

    #[test]
    fn foreground_appends_both_streams_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        fs::write(&log, "earlier\n").unwrap();
        let mut cfg = config("sh", &["-c", "echo to-stdout; echo to-stderr >&2"]);
        cfg.log_file = Some(log.clone());

        run_foreground(&cfg, None).unwrap();

        let content = fs::read_to_string(&log).unwrap();
        assert!(content.starts_with("earlier\n"));
        assert!(content.contains("to-stdout"));
        assert!(content.contains("to-stderr"));
    }

    #[test]
    fn foreground_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("app.pid");
        let lock = PidLock::acquire(&pid_path).unwrap();
        let mut cfg = config("true", &[]);
        cfg.pid_file = Some(pid_path.clone());

        run_foreground(&cfg, Some(lock)).unwrap();

        PidLock::acquire(&pid_path).unwrap();
    }

    #[test]
    fn pid_write_failure_kills_and_reaps_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let mut cfg = config("sleep", &["30"]);
        cfg.pid_file = Some(blocker.join("app.pid"));

        let started = std::time::Instant::now();
        let err = run_foreground(&cfg, None).unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::PidFile(pidfile::PidFileError::Write { .. })
        ));
        // Returning well before `sleep 30` ends means the child was killed.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_program_is_a_spawn_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("app.pid");
        let mut cfg = config("/definitely/not/a/program", &[]);
        cfg.pid_file = Some(pid_path.clone());

        let err = run_foreground(&cfg, None).unwrap_err();

        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert!(!pid_path.exists());
    }

    #[test]
    fn unopenable_log_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config("true", &[]);
        cfg.log_file = Some(dir.path().join("missing-dir").join("app.log"));

        let err = run_foreground(&cfg, None).unwrap_err();
        assert!(matches!(err, SupervisorError::LogFile { .. }));

        let err = spawn_detached(&cfg).unwrap_err();
        assert!(matches!(err, SupervisorError::LogFile { .. }));
    }
}
