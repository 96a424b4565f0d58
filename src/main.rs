// src/main.rs

use anyhow::{Context, Result};
use aptsnap::exec::{self, CommandRunner, SystemRunner};
use aptsnap::{Config, Correlator, Outcome, Phase};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Parser)]
#[command(name = "aptsnap")]
#[command(author, version, about = "Bracket APT transactions with linked snapper pre/post snapshots", long_about = None)]
struct Cli {
    /// Hook phase
    #[arg(value_enum)]
    phase: Phase,
}

/// Open the append-only log file as the tracing writer
fn log_writer(path: &Path) -> Result<BoxMakeWriter> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok(BoxMakeWriter::new(Mutex::new(file)))
}

fn init_logging(config: &Config) {
    let (writer, fallback) = match log_writer(&config.log_path) {
        Ok(writer) => (writer, None),
        Err(e) => (BoxMakeWriter::new(io::stderr), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(writer)
        .init();

    if let Some(e) = fallback {
        warn!("{:#}, logging to stderr", e);
    }
}

/// Parse the command line into a phase, or the exit status for a usage error
fn parse_phase<I, T>(args: I) -> std::result::Result<Phase, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli.phase),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let value = e
                .get(clap::error::ContextKind::InvalidValue)
                .map(|v| v.to_string())
                .unwrap_or_default();
            let msg = "Error: Invalid argument, must be either pre or post";
            println!("{}", msg);
            warn!("{}: {}", msg, e.kind());
            Err(aptsnap::Error::InvalidPhase(value).exit_code() as u8)
        }
    }
}

/// Run one hook phase; `input` carries the package archive paths for pre
fn run<R, B>(phase: Phase, config: &Config, runner: &R, input: B) -> aptsnap::Result<Outcome>
where
    R: CommandRunner,
    B: BufRead,
{
    let lines = match phase {
        Phase::Pre => input.lines().collect::<io::Result<Vec<String>>>()?,
        Phase::Post => Vec::new(),
    };

    Correlator::new(config, runner).handle(phase, &lines)
}

/// Print and log the result of a phase, returning the process exit status
///
/// Duplicate hook calls were already logged as warnings by the handler.
fn report(result: aptsnap::Result<Outcome>) -> u8 {
    match result {
        Ok(outcome) => {
            println!("{}", outcome);
            if !outcome.is_noop() {
                info!("{}", outcome);
            }
            0
        }
        Err(e) => {
            println!("Error: {}", e);
            error!("{}", e);
            e.exit_code() as u8
        }
    }
}

fn main() -> ExitCode {
    let config = Config::default();
    init_logging(&config);

    let phase = match parse_phase(std::env::args_os()) {
        Ok(phase) => phase,
        Err(status) => return ExitCode::from(status),
    };

    let result = exec::require_programs(config.required_programs())
        .and_then(|_| run(phase, &config, &SystemRunner, io::stdin().lock()));

    ExitCode::from(report(result))
}
