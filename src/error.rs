//! Error types for hana-bridge.

use thiserror::Error;

use crate::transport::TransportError;

/// The main error type for dialect and procedure operations.
#[derive(Debug, Error)]
pub enum HanaError {
    /// Missing or malformed connection configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument detected before any statement was sent.
    #[error("Argument error: {0}")]
    Argument(String),

    /// The database rejected or could not resolve a statement's target.
    #[error("Statement invalid: {0}")]
    StatementInvalid(String),

    /// A declared type has no output-parameter mapping.
    #[error("Output parameter type '{0}' is not supported yet.")]
    UnsupportedType(String),

    /// Feature the dialect does not provide (e.g. savepoints).
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Failure reported by the call-level transport, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Result rows could not be turned into the requested type.
    #[error("Instantiation error: {0}")]
    Instantiate(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HanaError {
    /// Create an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Create a configuration error for a required option that is absent.
    pub fn missing_option(option: &str) -> Self {
        Self::Config(format!("Missing :{} configuration.", option))
    }

    /// Whether this is a transport failure whose message contains `needle`
    /// (case-insensitive).
    pub fn transport_message_contains(&self, needle: &str) -> bool {
        match self {
            Self::Transport(err) => err
                .message
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => false,
        }
    }
}

/// Result type alias for hana-bridge operations.
pub type HanaResult<T> = Result<T, HanaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HanaError::missing_option("dsn");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing :dsn configuration."
        );
        let err = HanaError::UnsupportedType("blob".into());
        assert_eq!(
            err.to_string(),
            "Output parameter type 'blob' is not supported yet."
        );
    }

    #[test]
    fn test_transport_passthrough() {
        let err: HanaError = TransportError::new("SQL error 397: invalid object name").into();
        assert_eq!(err.to_string(), "SQL error 397: invalid object name");
        assert!(err.transport_message_contains("INVALID OBJECT"));
        assert!(!HanaError::argument("invalid name").transport_message_contains("invalid name"));
    }
}
