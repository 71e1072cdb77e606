use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TEI embed error: {0}")]
    Tei(String),

    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("configuration error: {0}")]
    Config(#[from] oppdb_core::ConfigError),

    #[error("embedding backend error: {0}")]
    Backend(String),
}
