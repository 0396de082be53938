//! Error types for the mythos retrieval pipeline

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared by every mythos crate
#[derive(Error, Debug)]
pub enum Error {
    /// The remote embedding call failed or returned malformed data
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The remote generation call failed or returned no text
    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    /// The persisted vectors and fragments do not form a valid pair
    #[error("Index artifact corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: index expects {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Embedding model mismatch: index was built with '{expected}', but '{found}' is configured")]
    ModelMismatch { expected: String, found: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether the error came from a remote service rather than local state
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingUnavailable(_) | Error::GenerationUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::DimensionMismatch {
            expected: 768,
            found: 384,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: index expects 768, got 384"
        );

        let err = Error::IndexCorrupt("5 vectors but 4 fragments".to_string());
        assert_eq!(
            err.to_string(),
            "Index artifact corrupt: 5 vectors but 4 fragments"
        );
    }

    #[test]
    fn test_is_remote() {
        assert!(Error::EmbeddingUnavailable("timeout".to_string()).is_remote());
        assert!(Error::GenerationUnavailable("429".to_string()).is_remote());
        assert!(!Error::InvalidArgument("k".to_string()).is_remote());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
