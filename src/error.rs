//! Error types for cputrack

use std::io;
use thiserror::Error;

/// Result type alias for cputrack operations
pub type Result<T> = std::result::Result<T, CpuTrackError>;

/// Error type shared by the parsers, readers and configuration layer
#[derive(Error, Debug)]
pub enum CpuTrackError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: CpuTrackError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CpuTrackError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_display() {
        let err = CpuTrackError::Parse("bad token".to_string());
        assert_eq!(err.to_string(), "Parse error: bad token");
    }
}
