//! Deterministic grounded-prompt construction.
//!
//! The assembler is a pure function of (history, passages, question) plus a
//! fixed template. Identical inputs always produce byte-identical prompts, so
//! the generation layer can be cached/replayed deterministically.

use crate::types::{Passage, Turn};

/// Refusal sentence the backend is instructed to reproduce verbatim when the
/// supplied context cannot answer the question. Part of the contract:
/// downstream consumers may compare against it to detect "no answer found".
pub const REFUSAL_TEXT: &str =
    "The provided context does not contain enough information to answer this question.";

/// Rendered in place of the history block for a first interaction. An explicit
/// marker avoids the ambiguity of an empty section in the prompt.
pub const NO_HISTORY_MARKER: &str = "(no prior conversation)";

/// Rendered in place of the context block when retrieval returned nothing.
pub const EMPTY_CONTEXT_MARKER: &str = "(no relevant context found)";

pub struct PromptAssembler;

impl PromptAssembler {
    /// Build the grounding-constrained prompt.
    ///
    /// History renders oldest-first as alternating User:/Assistant: lines;
    /// passages render in retrieval order separated by blank lines.
    pub fn build(history: &[Turn], passages: &[Passage], question: &str) -> String {
        let history_block = if history.is_empty() {
            NO_HISTORY_MARKER.to_string()
        } else {
            let mut rendered = String::new();
            for turn in history {
                rendered.push_str("User: ");
                rendered.push_str(&turn.question);
                rendered.push_str("\nAssistant: ");
                rendered.push_str(&turn.answer);
                rendered.push('\n');
            }
            rendered.trim_end().to_string()
        };

        let context_block = if passages.is_empty() {
            EMPTY_CONTEXT_MARKER.to_string()
        } else {
            passages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        format!(
            "You are a meticulous document assistant. Answer the user's question using ONLY \
             the Context and Conversation history below.\n\
             Rules:\n\
             1. Every statement must be grounded in the Context section. Do not use prior knowledge.\n\
             2. If multiple context fragments are relevant, synthesize them into one coherent answer.\n\
             3. If the context does not contain the information needed, reply exactly: \
             '{refusal}'\n\
             -----------------------------------------\n\
             Conversation history:\n{history}\n\
             -----------------------------------------\n\
             Context:\n{context}\n\
             -----------------------------------------\n\
             User: {question}\nAssistant:",
            refusal = REFUSAL_TEXT,
            history = history_block,
            context = context_block,
            question = question,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_turns() -> Vec<Turn> {
        vec![
            Turn::new("What is Milvus?", "A vector database."),
            Turn::new("Who maintains it?", "The Zilliz community."),
        ]
    }

    #[test]
    fn identical_inputs_yield_identical_prompts() {
        let history = sample_turns();
        let passages = vec![
            Passage::new("Milvus stores embeddings.", "docs/milvus.md"),
            Passage::new("It supports ANN search.", "docs/search.md"),
        ];
        let a = PromptAssembler::build(&history, &passages, "How does it search?");
        let b = PromptAssembler::build(&history, &passages, "How does it search?");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_history_renders_marker() {
        let prompt = PromptAssembler::build(&[], &[Passage::new("x", "s")], "q");
        assert!(prompt.contains(NO_HISTORY_MARKER));
    }

    #[test]
    fn empty_passages_render_marker_not_blank() {
        let prompt = PromptAssembler::build(&sample_turns(), &[], "q");
        assert!(prompt.contains(EMPTY_CONTEXT_MARKER));
        assert!(prompt.contains("Context:\n(no relevant context found)"));
    }

    #[test]
    fn history_renders_oldest_first() {
        let prompt = PromptAssembler::build(&sample_turns(), &[], "q");
        let first = prompt.find("What is Milvus?").unwrap();
        let second = prompt.find("Who maintains it?").unwrap();
        assert!(first < second);
    }

    #[test]
    fn passages_render_in_retrieval_order() {
        let passages = vec![
            Passage::new("alpha fragment", "a"),
            Passage::new("beta fragment", "b"),
        ];
        let prompt = PromptAssembler::build(&[], &passages, "q");
        assert!(prompt.find("alpha fragment").unwrap() < prompt.find("beta fragment").unwrap());
        assert!(prompt.contains("alpha fragment\n\nbeta fragment"));
    }

    #[test]
    fn refusal_sentence_embedded_in_template() {
        let prompt = PromptAssembler::build(&[], &[], "q");
        assert!(prompt.contains(REFUSAL_TEXT));
    }
}
