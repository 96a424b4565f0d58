// src/config.rs

//! Fixed settings shared by both hook phases
//!
//! Nothing here is configurable per invocation: APT runs the hooks with a
//! fixed command line, so the record and log live at well-known paths under
//! the system temp directory.

use std::env;
use std::path::PathBuf;

/// snapper configuration the snapshots belong to
pub const SNAPPER_CONFIG: &str = "root";

/// snapper cleanup algorithm attached to every snapshot
pub const CLEANUP_ALGORITHM: &str = "number";

/// Longest description snapper displays without wrapping
pub const DESCRIPTION_LIMIT: usize = 72;

/// File name of the correlation record
pub const RECORD_FILE: &str = "snap-apt.json";

/// File name of the append-only log
pub const LOG_FILE: &str = "snap-apt.log";

/// Settings for one hook invocation
#[derive(Debug, Clone)]
pub struct Config {
    pub snapper_config: String,
    pub cleanup_algorithm: String,
    pub description_limit: usize,
    pub record_path: PathBuf,
    pub log_path: PathBuf,
    pub snapper_program: String,
    pub dpkg_query_program: String,
    pub ps_program: String,
}

impl Config {
    /// Build a config whose record and log live under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            snapper_config: SNAPPER_CONFIG.to_string(),
            cleanup_algorithm: CLEANUP_ALGORITHM.to_string(),
            description_limit: DESCRIPTION_LIMIT,
            record_path: dir.join(RECORD_FILE),
            log_path: dir.join(LOG_FILE),
            snapper_program: "snapper".to_string(),
            dpkg_query_program: "dpkg-query".to_string(),
            ps_program: "ps".to_string(),
        }
    }

    /// Programs that must be installed for the hooks to do anything
    pub fn required_programs(&self) -> [&str; 2] {
        [self.snapper_program.as_str(), self.dpkg_query_program.as_str()]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::in_dir(env::temp_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_live_in_temp_dir() {
        let config = Config::default();
        assert_eq!(config.record_path, env::temp_dir().join("snap-apt.json"));
        assert_eq!(config.log_path, env::temp_dir().join("snap-apt.log"));
        assert_eq!(config.description_limit, 72);
    }

    #[test]
    fn test_required_programs() {
        let config = Config::in_dir("/var/tmp");
        assert_eq!(config.required_programs(), ["snapper", "dpkg-query"]);
    }
}
