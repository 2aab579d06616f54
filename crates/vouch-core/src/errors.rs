//! Unified error system for Vouch core
//!
//! One error type covers configuration, decoding and naming failures across
//! both crates. Packet-level validation failures are *not* errors in this
//! sense; policies report them as outcomes (see `vouch-policy`).

use serde::{Deserialize, Serialize};

/// Unified error type for all Vouch setup and decoding operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TrustError {
    /// Malformed trust schema. Fatal at load time.
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Malformed packet metadata or certificate encoding
    #[error("Decode error: {message}")]
    Decode {
        /// Error message describing the decoding failure
        message: String,
    },

    /// A name or name component could not be parsed
    #[error("Invalid name: {message}")]
    InvalidName {
        /// Error message describing the offending name
        message: String,
    },

    /// A name regex or expansion template could not be compiled
    #[error("Invalid pattern: {message}")]
    InvalidPattern {
        /// Error message describing the offending pattern
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl TrustError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::InvalidName {
            message: message.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            TrustError::Config { .. } => "config_error",
            TrustError::Decode { .. } => "decode_error",
            TrustError::InvalidName { .. } => "invalid_name",
            TrustError::InvalidPattern { .. } => "invalid_pattern",
            TrustError::NotFound { .. } => "not_found",
            TrustError::Internal { .. } => "internal",
        }
    }
}

/// Standard Result type for Vouch operations
pub type Result<T> = std::result::Result<T, TrustError>;

impl From<std::io::Error> for TrustError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TrustError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

impl From<base64::DecodeError> for TrustError {
    fn from(err: base64::DecodeError) -> Self {
        Self::decode(format!("bad base64: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TrustError::config("Expecting <rule.id>");
        assert!(matches!(err, TrustError::Config { .. }));
        assert_eq!(err.to_string(), "Config error: Expecting <rule.id>");
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "anchor missing");
        let err = TrustError::from(io_err);
        assert!(matches!(err, TrustError::NotFound { .. }));
    }
}
