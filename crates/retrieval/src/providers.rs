use crate::error::{CompletionError, SourceError};
use async_trait::async_trait;

/// Text-completion backend used for query rewriting and fetch decisions.
///
/// The orchestrator only ever asks for small JSON payloads; any chat-capable
/// model endpoint can implement this.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> std::result::Result<String, CompletionError>;
}

/// Read access to the repository a session is grounded in.
///
/// Implementations wrap a hosting provider API or a local checkout. Errors
/// use the [`SourceError`] taxonomy so the orchestrator can tell permanent
/// failures from retryable ones.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Full content of one file
    async fn fetch_file(&self, path: &str) -> std::result::Result<String, SourceError>;

    /// Paths of all files in the repository, used to ground fetch decisions
    async fn list_files(&self) -> std::result::Result<Vec<String>, SourceError>;
}
