use thiserror::Error;

pub type Result<T> = std::result::Result<T, DenseIndexError>;

#[derive(Error, Debug)]
pub enum DenseIndexError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Dense backend timed out after {0:?}")]
    Timeout(std::time::Duration),
}
