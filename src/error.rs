// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for aptsnap
#[derive(Error, Debug)]
pub enum Error {
    /// Phase argument was neither `pre` nor `post`
    #[error("Invalid argument '{0}', must be either pre or post")]
    InvalidPhase(String),

    /// A required external program is not on PATH
    #[error("Unable to find required program '{0}'")]
    ToolNotFound(String),

    /// No correlation record where one was expected
    #[error("No saved pre snapshot details in {}", .0.display())]
    RecordMissing(PathBuf),

    /// Correlation record exists but is not valid JSON for a record
    #[error("Could not load valid pre snapshot details from {}: {source}", path.display())]
    RecordCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Snapper printed no snapshot number
    #[error("snapper returned no snapshot number for {0} snapshot")]
    SnapshotFailed(String),

    /// Failure to spawn an external program
    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External program whose output must be trusted exited unsuccessfully
    #[error("'{program}' failed with status {status:?}: {stderr}")]
    CommandFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// dpkg-query succeeded but reported nothing installed
    #[error("'{0}' listed no installed packages")]
    NoInstalledPackages(String),

    /// Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPhase(_) => 1,
            Error::ToolNotFound(_) => 2,
            Error::RecordMissing(_) => 3,
            Error::RecordCorrupt { .. } => 4,
            Error::SnapshotFailed(_) => 5,
            Error::Spawn { .. }
            | Error::CommandFailed { .. }
            | Error::NoInstalledPackages(_)
            | Error::Json(_)
            | Error::Io(_) => 6,
        }
    }
}

/// Result type alias using aptsnap's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_operator_facing_errors() {
        let corrupt = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let codes = [
            Error::InvalidPhase("foo".to_string()).exit_code(),
            Error::ToolNotFound("snapper".to_string()).exit_code(),
            Error::RecordMissing(PathBuf::from("/tmp/x")).exit_code(),
            Error::RecordCorrupt {
                path: PathBuf::from("/tmp/x"),
                source: corrupt,
            }
            .exit_code(),
            Error::SnapshotFailed("pre".to_string()).exit_code(),
        ];
        assert_eq!(codes, [1, 2, 3, 4, 5]);
    }
}
