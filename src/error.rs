// src/error.rs
//! Unified error handling for the acquisition core
//!
//! Only a handful of failures ever reach a caller: opening the serial port at
//! `start()`, loading or validating configuration, and opening a recording file.
//! Everything else (framing errors, filter faults, write failures on the writer
//! thread, faults inside the acquisition loop) is handled at the boundary closest
//! to its origin and reported through logging or a status signal.

use crate::config::ConfigError;
use crate::processing::filters::FilterError;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, AcquireError>;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum AcquireError {
    /// The serial device could not be opened (absent, busy, permission denied)
    #[error("Failed to open serial port '{port}': {reason}")]
    Connection {
        /// Port name as given in the configuration
        port: String,
        /// Driver-reported reason
        reason: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A recording session could not be started
    #[error("Recording error: {0}")]
    Recording(String),

    /// Filter design or application failure
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Raw I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not permitted in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AcquireError {
    /// Build a connection error for `port`
    pub fn connection(port: impl Into<String>, reason: impl ToString) -> Self {
        AcquireError::Connection {
            port: port.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures the caller can retry after fixing the environment
    /// (plugging the device in, closing another program holding the port).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AcquireError::Connection { .. } | AcquireError::Recording(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = AcquireError::connection("COM12", "Access is denied");
        let formatted = err.to_string();
        assert!(formatted.contains("COM12"));
        assert!(formatted.contains("Access is denied"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: AcquireError = io.into();
        assert!(matches!(err, AcquireError::Io(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_filter_error_conversion() {
        let err: AcquireError = FilterError::InvalidParameters("order must be >= 1".to_string()).into();
        assert!(err.to_string().contains("order must be >= 1"));
    }
}
