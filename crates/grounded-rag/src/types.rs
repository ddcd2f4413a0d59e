use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrieved context fragment with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// One question/answer exchange. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }
}

/// Source reference attached to an answer, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
}

/// Completed pipeline result returned to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResult {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl AskResult {
    /// Map retrieved passages to source refs, preserving retrieval order.
    pub fn sources_from(passages: &[Passage]) -> Vec<SourceRef> {
        passages
            .iter()
            .map(|p| SourceRef {
                source: p.source.clone(),
            })
            .collect()
    }
}
