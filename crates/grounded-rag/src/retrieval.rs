//! Document index contract and a small in-memory reference implementation.
//!
//! The real index (vector store, hybrid search, whatever serves the
//! deployment) lives behind `DocumentIndex`; the pipeline only depends on the
//! trait. Retrieval failure is fatal to a request — the pipeline never
//! substitutes cached or empty context for an unreachable index.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::error::{RagError, Result};
use crate::types::Passage;

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Return up to `k` passages ordered by descending relevance. Ties break
    /// deterministically per implementation. Fails with
    /// `RagError::RetrievalUnavailable` when the backing index is unreachable.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>>;
}

/// Keyword-overlap index over an in-process corpus. Good enough to exercise
/// the pipeline end to end without external services; not a substitute for a
/// real vector index.
#[derive(Default)]
pub struct InMemoryIndex {
    passages: RwLock<Vec<Passage>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, text: impl Into<String>, source: impl Into<String>) {
        let mut passages = self.passages.write().unwrap_or_else(|e| e.into_inner());
        passages.push(Passage::new(text, source));
    }

    pub fn len(&self) -> usize {
        self.passages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }
}

#[async_trait]
impl DocumentIndex for InMemoryIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let query_words = Self::tokenize(query);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let passages = self.passages.read().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<Passage> = passages
            .iter()
            .filter_map(|p| {
                let text_lower = p.text.to_lowercase();
                let hits = query_words
                    .iter()
                    .filter(|w| text_lower.contains(w.as_str()))
                    .count();
                if hits == 0 {
                    return None;
                }
                let score = hits as f32 / query_words.len() as f32;
                Some(p.clone().with_score(score))
            })
            .collect();

        // Stable sort keeps insertion order for equal scores, so ties break
        // the same way on every call.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

/// Index stub that always fails, for exercising the unavailable path.
pub struct UnavailableIndex;

#[async_trait]
impl DocumentIndex for UnavailableIndex {
    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<Passage>> {
        Err(RagError::RetrievalUnavailable(
            "document index unreachable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_index() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index.add("Milvus is a vector database for embeddings.", "docA");
        index.add("Tokio is an async runtime for Rust.", "docB");
        index.add("Vector search ranks passages by similarity.", "docC");
        index
    }

    #[tokio::test]
    async fn retrieve_respects_k() {
        let index = seeded_index();
        let hits = index.retrieve("vector database search", 2).await.unwrap();
        assert!(hits.len() <= 2);
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn results_are_descending_by_score() {
        let index = seeded_index();
        let hits = index.retrieve("vector database embeddings", 3).await.unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].score.unwrap() >= pair[1].score.unwrap());
        }
    }

    #[tokio::test]
    async fn unrelated_query_returns_empty() {
        let index = seeded_index();
        let hits = index.retrieve("quantum gravitational wobble", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn ties_break_by_insertion_order() {
        let index = InMemoryIndex::new();
        index.add("rust first", "first");
        index.add("rust second", "second");
        let a = index.retrieve("rust", 2).await.unwrap();
        let b = index.retrieve("rust", 2).await.unwrap();
        assert_eq!(a[0].source, "first");
        assert_eq!(b[0].source, "first");
    }

    #[tokio::test]
    async fn unavailable_index_fails() {
        let err = UnavailableIndex.retrieve("q", 3).await.unwrap_err();
        assert!(matches!(err, RagError::RetrievalUnavailable(_)));
    }
}
