// src/exec.rs

//! Running external programs
//!
//! Every collaborator (snapper, dpkg-query, ps) goes through
//! [`CommandRunner`], so tests can script their output and all text parsing
//! stays on this side of the seam.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Captured result of one external program run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status, `None` when killed by a signal
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs a program to completion and captures its output
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by real child processes
///
/// Calls block until the child exits; there is no timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("Running {} {:?}", program, args);

        let output = Command::new(program).args(args).output().map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}

/// Run a program and return its trimmed stdout
///
/// Anything on stderr or a non-zero exit is logged as a warning and the
/// output is still handed back; callers decide whether an empty result
/// matters.
pub fn run_lenient<R: CommandRunner + ?Sized>(runner: &R, program: &str, args: &[&str]) -> Result<String> {
    let output = runner.run(program, args)?;

    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        warn!("Error occurred on executing {} {:?} :: {}", program, args, stderr);
    }
    if !output.success() {
        warn!("{} exited with status {:?}", program, output.status);
    }

    Ok(output.stdout.trim().to_string())
}

/// Run a program whose output is trusted as data and return its stdout
///
/// A non-zero exit is an error: a failed query must never be mistaken for
/// an empty answer. Stderr from a successful run is only logged.
pub fn run_strict<R: CommandRunner + ?Sized>(runner: &R, program: &str, args: &[&str]) -> Result<String> {
    let output = runner.run(program, args)?;

    if !output.success() {
        return Err(Error::CommandFailed {
            program: program.to_string(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }

    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        warn!("{} {:?} reported :: {}", program, args, stderr);
    }

    Ok(output.stdout)
}

/// Resolve each program on PATH, failing on the first one that is missing
pub fn require_programs<'a>(programs: impl IntoIterator<Item = &'a str>) -> Result<Vec<PathBuf>> {
    programs
        .into_iter()
        .map(|program| which::which(program).map_err(|_| Error::ToolNotFound(program.to_string())))
        .collect()
}
