//! A foreground supervisor passes SIGTERM on to its child.
//!
//! This lives in its own test binary because the signal is sent to the whole
//! test process, and no other test may be waiting on a child at the time.

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::{Pid, getpid};
use procmanager::launcher::{self, LaunchConfig};

#[test]
fn sigterm_to_foreground_supervisor_reaches_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let child_pid = dir.path().join("child.pid");
    let pid_file = dir.path().join("app.pid");
    let config = LaunchConfig {
        program: PathBuf::from("sh"),
        args: vec![
            "-c".into(),
            format!("echo $$ > '{}'; exec sleep 30", child_pid.display()).into(),
        ],
        daemonize: false,
        log_file: None,
        pid_file: Some(pid_file.clone()),
    };

    let sender = {
        let child_pid = child_pid.clone();
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(10);
            while fs::read_to_string(&child_pid).map_or(true, |s| s.trim().is_empty()) {
                assert!(Instant::now() < deadline, "child never started");
                thread::sleep(Duration::from_millis(20));
            }
            // Handlers are installed before the child is spawned, so this is
            // recorded rather than fatal.
            kill(getpid(), Signal::SIGTERM).unwrap();
        })
    };

    let started = Instant::now();
    let status = launcher::run_foreground(&config, None).unwrap();
    sender.join().unwrap();

    assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(!pid_file.exists());
}
