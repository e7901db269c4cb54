//! Error taxonomy for the corpus-qa core.
//!
//! Every failure the core can surface is one of these variants. Ingestion
//! errors abort the whole document (no partial chunk sets are persisted);
//! query errors abort the single `ask` call. None of them are fatal to the
//! process, and none leave the index in a state where subsequent calls fail.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Page-text extraction failed (encrypted, corrupt, or unreadable file).
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// The embedding collaborator could not produce vectors.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The language-model collaborator could not produce a completion.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The durable vector store could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An external call exceeded its deadline. Distinct from a content-level
    /// refusal, which is a successful answer.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Caller-supplied input was rejected (e.g. `k <= 0`, empty question).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::StorageUnavailable(err.to_string())
    }
}
