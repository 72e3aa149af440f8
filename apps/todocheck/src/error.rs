//! Error type shared by the check pipeline.
//!
//! Input problems (missing or unparsable issues/exemption files, bad
//! configuration) abort the run before scanning. Marker violations are never
//! errors on their own; they accumulate and surface once as `CheckFailed`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// The open-issues JSON file does not exist under the repository root.
    #[error("{}: No such file exists", .0.display())]
    MissingInputFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid issues JSON in {}: {source}", .path.display())]
    InvalidIssues {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid exemptions file {}: {message}", .path.display())]
    InvalidExemptions { path: PathBuf, message: String },

    #[error("invalid config {}: {message}", .path.display())]
    InvalidConfig { path: PathBuf, message: String },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// One or more violation categories were non-empty. Carries the full
    /// rendered report.
    #[error("TODO CHECK FAILED\n{report}")]
    CheckFailed { report: String },
}

impl CheckError {
    /// Exit code used by the binary: 1 for a failed check, 2 for anything
    /// that prevented the check from running.
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckError::CheckFailed { .. } => 1,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
