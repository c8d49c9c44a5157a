//! Common error types for megamap
//!
//! Every fatal condition has its own variant so that the binaries can exit
//! with a distinct status per condition.

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for megamap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the megamap crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required credential absent from the environment
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    /// Required input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Header row or required columns could not be located
    #[error("Unparseable header: {0}")]
    UnparseableHeader(String),

    /// Capped record count still above the absolute ceiling
    #[error("Too many points after caps: {count} > {ceiling} - tighten filters or caps")]
    HardCeilingExceeded { count: usize, ceiling: usize },

    /// Generated artifact failed the post-generation guard
    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Internal(_) => 1,
            Error::Config(_) | Error::InvalidInput(_) | Error::MissingCredential(_) => 2,
            Error::MissingInput(_) => 3,
            Error::MalformedOutput(_) => 4,
            Error::HardCeilingExceeded { .. } => 5,
            Error::UnparseableHeader(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_fatal_condition() {
        let missing_input = Error::MissingInput(PathBuf::from("x.csv"));
        let header = Error::UnparseableHeader("no name column".to_string());
        let ceiling = Error::HardCeilingExceeded { count: 3000, ceiling: 2000 };
        let guard = Error::MalformedOutput(".{".to_string());
        let credential = Error::MissingCredential("EBIRD_API_KEY".to_string());

        let codes = [
            credential.exit_code(),
            missing_input.exit_code(),
            guard.exit_code(),
            ceiling.exit_code(),
            header.exit_code(),
        ];
        assert_eq!(codes, [2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_hard_ceiling_message() {
        let err = Error::HardCeilingExceeded { count: 2500, ceiling: 2000 };
        assert_eq!(
            err.to_string(),
            "Too many points after caps: 2500 > 2000 - tighten filters or caps"
        );
    }
}
