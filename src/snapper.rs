// src/snapper.rs

//! snapper invoker
//!
//! Wraps `snapper create` and `snapper modify`. snapper prints the new
//! snapshot number on stdout when given `-p`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{run_lenient, CommandRunner};
use tracing::{debug, info};

/// Kind of snapshot in a pre/post pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotType {
    Pre,
    Post,
}

impl SnapshotType {
    pub fn as_str(&self) -> &str {
        match self {
            SnapshotType::Pre => "pre",
            SnapshotType::Post => "post",
        }
    }
}

/// Handle for issuing snapper commands against one config
pub struct Snapper<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    program: &'a str,
    config_name: &'a str,
    cleanup_algorithm: &'a str,
}

impl<'a, R: CommandRunner + ?Sized> Snapper<'a, R> {
    pub fn new(runner: &'a R, config: &'a Config) -> Self {
        Self {
            runner,
            program: &config.snapper_program,
            config_name: &config.snapper_config,
            cleanup_algorithm: &config.cleanup_algorithm,
        }
    }

    /// Create a pre snapshot and return its number
    pub fn create_pre(&self, description: &str) -> Result<String> {
        self.create(SnapshotType::Pre, None, description)
    }

    /// Create a post snapshot paired with `pre_number` and return its number
    pub fn create_post(&self, pre_number: &str, description: &str) -> Result<String> {
        self.create(SnapshotType::Post, Some(pre_number), description)
    }

    fn create(&self, snapshot_type: SnapshotType, pre_number: Option<&str>, description: &str) -> Result<String> {
        let mut args = vec!["-c", self.config_name, "create", "-t", snapshot_type.as_str()];
        if let Some(pre) = pre_number {
            args.extend(["--pre-number", pre]);
        }
        args.extend(["-c", self.cleanup_algorithm, "-p", "-d", description]);

        let number = run_lenient(self.runner, self.program, &args)?;
        if number.is_empty() {
            return Err(Error::SnapshotFailed(snapshot_type.as_str().to_string()));
        }

        info!("Created {} snapshot {}: {}", snapshot_type.as_str(), number, description);
        Ok(number)
    }

    /// Replace the description of an existing snapshot
    pub fn modify_description(&self, number: &str, description: &str) -> Result<()> {
        let args = ["-c", self.config_name, "modify", "-d", description, number];
        run_lenient(self.runner, self.program, &args)?;
        debug!("Updated description of snapshot {}: {}", number, description);
        Ok(())
    }
}
