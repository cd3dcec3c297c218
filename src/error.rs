//! Error types for the hook service.

use thiserror::Error;

/// Common error type for the hook service.
#[derive(Error, Debug)]
pub enum HookError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure while talking to an upstream source.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream source answered with an unexpected status or payload.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Feed or JSON payload could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Validation error for subscriber settings.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown IANA timezone name.
    #[error("unknown timezone: {0}")]
    Timezone(String),
}

impl From<sqlx::Error> for HookError {
    fn from(e: sqlx::Error) -> Self {
        HookError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for HookError {
    fn from(e: reqwest::Error) -> Self {
        HookError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for HookError {
    fn from(e: serde_json::Error) -> Self {
        HookError::Parse(e.to_string())
    }
}

/// Result type alias for hook service operations.
pub type Result<T> = std::result::Result<T, HookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = HookError::Validation("offset out of range".to_string());
        assert_eq!(err.to_string(), "validation error: offset out of range");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = HookError::NotFound("webhook".to_string());
        assert_eq!(err.to_string(), "webhook not found");
    }

    #[test]
    fn test_timezone_error_display() {
        let err = HookError::Timezone("Mars/Olympus".to_string());
        assert_eq!(err.to_string(), "unknown timezone: Mars/Olympus");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HookError = io_err.into();
        assert!(matches!(err, HookError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: HookError = json_err.into();
        assert!(matches!(err, HookError::Parse(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(HookError::Upstream("status 500".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
