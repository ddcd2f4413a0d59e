//! Retrieval-augmented answering with bounded per-user conversation memory.
//!
//! The pipeline retrieves passages from a [`retrieval::DocumentIndex`],
//! assembles a grounding-constrained prompt with the user's rolling history,
//! invokes a [`llm::GenerationBackend`] (batch or streaming), and records the
//! exchange in the concurrency-safe [`session::SessionStore`].

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod session;
pub mod types;

// Re-export primary types for convenience
pub use config::{GenerationConfig, RagConfig, RetrievalConfig, SessionConfig};
pub use error::{RagError, Result};
pub use llm::{GenerationBackend, GenerationClient, HttpBackend, TokenStream};
pub use pipeline::{RagPipeline, DEGRADED_ANSWER};
pub use prompt::{PromptAssembler, EMPTY_CONTEXT_MARKER, NO_HISTORY_MARKER, REFUSAL_TEXT};
pub use retrieval::{DocumentIndex, InMemoryIndex};
pub use session::SessionStore;
pub use types::{AskResult, Passage, SourceRef, Turn};
