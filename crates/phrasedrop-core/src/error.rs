//! Unified error types for Phrasedrop.

use thiserror::Error;

/// Result type alias using PhrasedropError.
pub type Result<T> = std::result::Result<T, PhrasedropError>;

#[derive(Error, Debug)]
pub enum PhrasedropError {
    #[error("Configuration error: {0}")]
    Config(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Staged consumption records failed to persist. Messages were already
    /// sent when this fires; losing the records causes duplicate delivery
    /// on later cycles.
    #[error("Consumption commit failed: {0}")]
    Commit(String),

    // Transport errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhrasedropError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhrasedropError::Channel("timeout".into());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_constructors() {
        let e1 = PhrasedropError::config("test");
        assert!(matches!(e1, PhrasedropError::Config(_)));

        let e2 = PhrasedropError::store("test");
        assert!(matches!(e2, PhrasedropError::Store(_)));

        let e3 = PhrasedropError::channel("test");
        assert!(matches!(e3, PhrasedropError::Channel(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PhrasedropError = io_err.into();
        assert!(matches!(err, PhrasedropError::Io(_)));
    }
}
