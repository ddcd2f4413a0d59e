//! Request orchestration: retrieve, assemble, generate, record.
//!
//! The pipeline is stateless per request; the only shared mutable state is
//! the `SessionStore`, and the pipeline only touches it through `history_of`
//! and `append`. Retrieval and generation both happen outside any session
//! lock.

use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::llm::{GenerationClient, TokenStream};
use crate::prompt::PromptAssembler;
use crate::retrieval::DocumentIndex;
use crate::session::SessionStore;
use crate::types::{AskResult, Passage};

/// Substitute answer recorded and returned when the generation backend is
/// down. Fixed so callers can detect the degraded case; the request still
/// completes and still lands in history.
pub const DEGRADED_ANSWER: &str = "The generation backend is currently unavailable; please retry.";

pub struct RagPipeline {
    index: Arc<dyn DocumentIndex>,
    generation: GenerationClient,
    sessions: Arc<SessionStore>,
    config: RagConfig,
}

impl RagPipeline {
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        generation: GenerationClient,
        config: RagConfig,
    ) -> Self {
        tracing::info!(
            max_turns = config.session.max_turns,
            default_k = config.retrieval.default_k,
            streaming = generation.supports_streaming(),
            "RAG pipeline ready"
        );
        let sessions = Arc::new(SessionStore::new(config.session.max_turns));
        Self {
            index,
            generation,
            sessions,
            config,
        }
    }

    /// Session state, exposed for the transport layer and tests.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer a question in one shot.
    ///
    /// Retrieval failure propagates and records nothing; generation failure
    /// degrades into [`DEGRADED_ANSWER`] and the exchange is still recorded.
    pub async fn ask(&self, user_id: &str, question: &str, k: Option<usize>) -> Result<AskResult> {
        let (question, passages, prompt) = self.prepare(user_id, question, k).await?;

        let answer = match self.generation.backend().generate(&prompt).await {
            Ok(answer) => answer,
            Err(RagError::GenerationUnavailable(reason)) => {
                tracing::warn!(user_id, %reason, "generation failed, degrading");
                DEGRADED_ANSWER.to_string()
            }
            Err(other) => return Err(other),
        };

        self.sessions.append(user_id, &question, &answer);
        Ok(AskResult {
            sources: AskResult::sources_from(&passages),
            question,
            answer,
        })
    }

    /// Answer a question as a fragment stream.
    ///
    /// Fragments are forwarded one-for-one as the backend emits them. When
    /// the stream finishes — or the consumer stops pulling — the
    /// concatenation of everything produced so far is appended to the user's
    /// history, so history always reflects what the client actually received.
    pub async fn ask_stream(
        &self,
        user_id: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<TokenStream> {
        let (question, _passages, prompt) = self.prepare(user_id, question, k).await?;

        let (tx, rx) = mpsc::channel(100);
        let sessions = Arc::clone(&self.sessions);
        let backend = Arc::clone(self.generation.backend());
        let streaming = self.generation.supports_streaming();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let mut accumulated = String::new();
            if streaming {
                match backend.generate_stream(&prompt).await {
                    Ok(mut upstream) => {
                        while let Some(fragment) = upstream.next().await {
                            accumulated.push_str(&fragment);
                            if tx.send(fragment).await.is_err() {
                                tracing::warn!(
                                    user_id = %user_id,
                                    produced = accumulated.len(),
                                    "client cancelled stream, recording partial answer"
                                );
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(user_id = %user_id, %err, "streaming generation failed, degrading");
                        accumulated = DEGRADED_ANSWER.to_string();
                        let _ = tx.send(accumulated.clone()).await;
                    }
                }
            } else {
                // Batch-only backend: one fragment carrying the whole answer.
                accumulated = match backend.generate(&prompt).await {
                    Ok(answer) => answer,
                    Err(err) => {
                        tracing::warn!(user_id = %user_id, %err, "generation failed, degrading");
                        DEGRADED_ANSWER.to_string()
                    }
                };
                let _ = tx.send(accumulated.clone()).await;
            }
            sessions.append(&user_id, &question, &accumulated);
        });

        Ok(TokenStream::new(rx))
    }

    /// Shared steps 1-4: validate, retrieve, read history, assemble.
    async fn prepare(
        &self,
        user_id: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<(String, Vec<Passage>, String)> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".into()));
        }
        let k = k.unwrap_or(self.config.retrieval.default_k);
        let request_id = Uuid::new_v4();

        let passages = self.index.retrieve(question, k).await?;
        let history = self.sessions.history_of(user_id);
        let prompt = PromptAssembler::build(&history, &passages, question);

        tracing::debug!(
            %request_id,
            user_id,
            k,
            passages = passages.len(),
            history_turns = history.len(),
            prompt_chars = prompt.len(),
            "prompt assembled"
        );
        Ok((question.to_string(), passages, prompt))
    }
}
