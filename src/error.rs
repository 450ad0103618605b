use thiserror::Error;

/// Custom error types for the class deck
#[derive(Debug, Error)]
pub enum DeckError {
    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Persisted schema errors
    #[error("Unsupported quiz stats schema version {0}")]
    UnsupportedSchemaVersion(u32),

    #[error("Malformed persisted state: {0}")]
    MalformedState(String),

    /// Room errors
    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),

    /// Channel errors
    #[error("Channel to {0} is not open")]
    ChannelClosed(String),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigurationParseFailed(String),
}

/// Convenience type alias for Results using DeckError
pub type Result<T> = std::result::Result<T, DeckError>;

impl DeckError {
    /// Helper to create storage errors
    pub fn storage(msg: impl Into<String>) -> Self {
        DeckError::Storage(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeckError::ChannelClosed("tcu-deck-AB12".to_string());
        assert_eq!(err.to_string(), "Channel to tcu-deck-AB12 is not open");

        let err = DeckError::UnsupportedSchemaVersion(7);
        assert_eq!(err.to_string(), "Unsupported quiz stats schema version 7");
    }

    #[test]
    fn test_error_helpers() {
        let err = DeckError::storage("disk full");
        assert!(matches!(err, DeckError::Storage(_)));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: DeckError = parse.unwrap_err().into();
        assert!(matches!(err, DeckError::SerializationFailed(_)));
    }
}
