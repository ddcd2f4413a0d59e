//! Generation backend contract and capability wrapper.

use async_trait::async_trait;
use std::sync::Arc;

pub mod http;
pub mod streaming;

pub use http::HttpBackend;
pub use streaming::TokenStream;

use crate::error::Result;

/// Text-generation backend. Adapters normalize whatever wire shape their
/// provider speaks into a plain answer string (or fragment stream) at this
/// boundary; nothing downstream ever probes provider-specific fields.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Blocking completion: the full answer text for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Fragment stream for a prompt, in emission order. Concatenating the
    /// fragments reconstructs the full answer.
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream>;
}

/// Streaming capability is decided once, when the client is built, never
/// re-probed per request. A `BatchOnly` handle never has `generate_stream`
/// called on it.
#[derive(Clone)]
pub enum GenerationClient {
    Streaming(Arc<dyn GenerationBackend>),
    BatchOnly(Arc<dyn GenerationBackend>),
}

impl GenerationClient {
    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        match self {
            Self::Streaming(b) | Self::BatchOnly(b) => b,
        }
    }

    pub fn supports_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }
}
