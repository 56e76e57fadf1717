use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};
use procmanager::cli::{self, Cmd};
use procmanager::{Supervisor, SupervisorConfig, SystemControl};

fn main() -> ExitCode {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    match real_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Failures are part of the tool's stdout contract, not just diagnostics.
            println!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main(args: cli::Args) -> Result<()> {
    let config = if args.no_config {
        SupervisorConfig::default()
    } else {
        SupervisorConfig::discover(args.config.as_deref()).context("failed to load configuration")?
    };
    debug!("effective configuration: {config:?}");

    let supervisor = Supervisor::new(config, SystemControl);
    match args.cmd {
        Cmd::Start(launch) => supervisor.start(launch)?,
        Cmd::Stop(stop) => supervisor.stop(stop)?,
        Cmd::Status(status) => supervisor.status(status)?,
        Cmd::Restart(restart) => supervisor.restart(restart)?,
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
