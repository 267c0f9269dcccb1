//! Error types shared by the catalog, media and server layers.
//!
//! The subtitle core (parser, merger, resolver, sync controller) never fails;
//! these errors only surface from I/O glue.

/// Result type for EchoLine operations
pub type Result<T> = std::result::Result<T, EchoLineError>;

/// Error types for EchoLine operations
#[derive(thiserror::Error, Debug)]
pub enum EchoLineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Episode not found: {0}")]
    NotFound(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Thumbnail extraction failed: {0}")]
    Thumbnail(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EchoLineError {
    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(EchoLineError::NotFound(3).is_client_error());
        assert!(EchoLineError::invalid("missing video").is_client_error());
        assert!(!EchoLineError::Thumbnail("ffmpeg exited".into()).is_client_error());
    }

    #[test]
    fn test_error_messages() {
        let err = EchoLineError::NotFound(7);
        assert_eq!(err.to_string(), "Episode not found: 7");
    }
}
