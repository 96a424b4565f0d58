// src/apt.rs

//! Package manager queries
//!
//! - package names from the archive paths APT feeds the pre hook
//! - installed package names via `dpkg-query`
//! - the running `apt`/`apt-get` command line via `ps` (best-effort)

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{run_lenient, run_strict, CommandRunner};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Programs whose command line describes a transaction
const APT_FRONTENDS: &[&str] = &["apt", "apt-get"];

/// dpkg status of a fully installed package
const INSTALLED_STATUS: &str = "installed";

/// dpkg-query output format: one `"<status> <name>"` per line
const INSTALLED_FORMAT: &str = "${db:Status-Status} ${Package}\\n";

/// Reduce staged archive paths to bare package names
///
/// `/var/cache/apt/archives/foo_1.0-1_amd64.deb` becomes `foo`: the text
/// after the last `/`, then the text before the first `_`. Blank lines are
/// skipped; order and duplicates are kept.
pub fn package_names<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let file = line.rsplit('/').next().unwrap_or(line);
            let name = file.split('_').next().unwrap_or(file);
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Names in `before` that are not in `after`, in `before` order
pub fn removed_packages(before: &[String], after: &[String]) -> Vec<String> {
    let remaining: HashSet<&str> = after.iter().map(String::as_str).collect();
    before
        .iter()
        .filter(|name| !remaining.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Parse `"<status> <name>"` lines, keeping names whose status is `installed`
///
/// Removed packages linger in dpkg's database in the `config-files` state
/// until purged; they must not count as installed.
pub fn parse_installed_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(INSTALLED_STATUS), Some(name)) => Some(name.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Find the first `apt`/`apt-get` command line in `ps -eo args=` output
///
/// The program path is reduced to its file name, so
/// `/usr/bin/apt remove qux` yields `apt remove qux`.
pub fn find_apt_invocation(ps_output: &str) -> Option<String> {
    ps_output.lines().find_map(|line| {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        let name = Path::new(program).file_name()?.to_str()?;
        if !APT_FRONTENDS.contains(&name) {
            return None;
        }
        let args: Vec<&str> = words.collect();
        Some(if args.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, args.join(" "))
        })
    })
}

/// Package manager queries through a [`CommandRunner`]
pub struct PackageManager<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    config: &'a Config,
}

impl<'a, R: CommandRunner + ?Sized> PackageManager<'a, R> {
    pub fn new(runner: &'a R, config: &'a Config) -> Self {
        Self { runner, config }
    }

    /// Names of every installed package
    ///
    /// The result feeds the removal diff, so a failed query or an empty
    /// listing is an error rather than "nothing installed". dpkg itself is
    /// always installed on a working system.
    pub fn installed_packages(&self) -> Result<Vec<String>> {
        let program = &self.config.dpkg_query_program;
        let output = run_strict(self.runner, program, &["-W", "-f", INSTALLED_FORMAT])?;

        let packages = parse_installed_list(&output);
        if packages.is_empty() {
            return Err(Error::NoInstalledPackages(program.clone()));
        }

        debug!("Found {} installed packages", packages.len());
        Ok(packages)
    }

    /// Command line of the running apt frontend, if one can be found
    ///
    /// Purely descriptive. The process table can change under us, and any
    /// failure just means no invocation is reported.
    pub fn running_invocation(&self) -> Option<String> {
        match run_lenient(self.runner, &self.config.ps_program, &["-eo", "args="]) {
            Ok(output) => find_apt_invocation(&output),
            Err(e) => {
                debug!("Process table scan failed: {}", e);
                None
            }
        }
    }
}
