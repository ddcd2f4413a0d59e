use thiserror::Error;

/// Request-level failure taxonomy for the pipeline.
///
/// Only `InvalidInput` and `RetrievalUnavailable` ever surface from
/// `ask`/`ask_stream`; a generation failure is absorbed into the degraded
/// answer so the conversation stays responsive.
#[derive(Debug, Error)]
pub enum RagError {
    /// Rejected before any external call is made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Document index unreachable. Fatal to the request; no history is
    /// recorded because the question never reached generation.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Generation backend failed or timed out. Used internally by backend
    /// adapters; the pipeline converts it into the degraded answer.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
