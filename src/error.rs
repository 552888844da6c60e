//! Error types for Anonium client operations.

use thiserror::Error;

/// Result type alias for Anonium client operations.
pub type Result<T> = std::result::Result<T, AnoniumError>;

/// Main error type for Anonium client operations.
#[derive(Error, Debug)]
pub enum AnoniumError {
    /// Transport-level HTTP failures (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The backend answered with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key/value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Server data that violates a record invariant
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnoniumError {
    /// Creates a new API status error.
    pub fn api<T: ToString>(status: u16, msg: T) -> Self {
        Self::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Creates a new invalid response error.
    pub fn invalid_response<T: ToString>(msg: T) -> Self {
        Self::InvalidResponse(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new invalid input error.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Returns the HTTP status if this error came from a backend response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the error is a 404 from the backend.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<serde_json::Error> for AnoniumError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = AnoniumError::api(404, "Not found");
        assert_eq!(err.to_string(), "API error 404: Not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_absent_for_local_errors() {
        assert_eq!(AnoniumError::storage("disk full").status(), None);
        assert!(!AnoniumError::validation("bad id").is_not_found());
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: AnoniumError = parse.unwrap_err().into();
        assert!(matches!(err, AnoniumError::Serialization(_)));
    }
}
