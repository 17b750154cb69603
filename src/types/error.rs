//! Error types for Junction

/// Main error type for gateway-level operations
#[derive(Debug, thiserror::Error)]
pub enum JunctionError {
    #[error("Bad payload: {0}")]
    BadPayload(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From conversions for common error types

impl From<std::io::Error> for JunctionError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for JunctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadPayload(format!("JSON error: {}", err))
    }
}

impl From<async_nats::Error> for JunctionError {
    fn from(err: async_nats::Error) -> Self {
        Self::Nats(err.to_string())
    }
}

/// Result type alias for gateway-level operations
pub type Result<T> = std::result::Result<T, JunctionError>;
