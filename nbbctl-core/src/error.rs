/// Structured error types for nbbctl-core.
///
/// Library consumers (nbbctl-store) get composable `thiserror` errors;
/// the binary wraps them in `anyhow` with context.

use std::io;
use thiserror::Error;

/// Main error type for nbbctl-core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON serialization failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// A line of the record stream could not be decoded into a record
    #[error("Malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        source: serde_json::Error,
    },

    /// A required startup parameter is absent or empty
    #[error("Missing required parameter {name}")]
    MissingParameter { name: &'static str },

    /// A startup parameter is present but unusable
    #[error("Invalid value {value:?} for parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias for nbbctl-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create a malformed record error for a 1-based line number
    pub fn malformed(line: usize, source: serde_json::Error) -> Self {
        Self::MalformedRecord { line, source }
    }

    pub fn missing_parameter(name: &'static str) -> Self {
        Self::MissingParameter { name }
    }

    pub fn invalid_parameter(
        name: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::missing_parameter("DB_HOST");
        assert_eq!(err.to_string(), "Missing required parameter DB_HOST");

        let err = CoreError::invalid_parameter("DB_PORT", "abc", "not a port number");
        assert!(err.to_string().contains("DB_PORT"));
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_malformed_record_names_line() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = CoreError::malformed(7, source);
        assert!(err.to_string().starts_with("Malformed record on line 7"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();

        assert!(matches!(core_err, CoreError::Io { .. }));
    }
}
