use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors surfaced by fetching from a repository source.
///
/// `RateLimited` and `Transport` are retryable; the others describe the
/// file or the caller's access and repeating the request cannot help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by source")]
    RateLimited {
        /// Server-suggested wait, when one was given
        retry_after_ms: Option<u64>,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl SourceError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. } | SourceError::Transport(_)
        )
    }
}

/// Errors surfaced by the text-completion backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Chunker error: {0}")]
    Chunker(#[from] repolens_code_chunker::ChunkerError),

    #[error("Session error: {0}")]
    Session(#[from] repolens_session::SessionError),

    #[error("Dense index error: {0}")]
    Dense(#[from] repolens_dense_index::DenseIndexError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
