//! Bounded per-user conversation history.
//!
//! Sessions live in a `DashMap` keyed by user id. Entry locking gives
//! per-key atomicity: an append (push + eviction) happens under the entry
//! guard, so readers never observe a partially-evicted state and concurrent
//! appends for the same user serialize without losing a turn. Sessions for
//! different users only contend at shard granularity.

use dashmap::DashMap;
use std::collections::VecDeque;

use crate::types::Turn;

/// Per-user state. Created lazily on first interaction and kept for the
/// process lifetime.
#[derive(Debug)]
pub struct Session {
    pub user_id: String,
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl Session {
    fn new(user_id: &str, max_turns: usize) -> Self {
        Self {
            user_id: user_id.to_string(),
            turns: VecDeque::with_capacity(max_turns + 1),
            max_turns,
        }
    }

    /// Push the newest turn, then evict from the oldest end until
    /// `len <= max_turns` holds again.
    fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }
}

/// Concurrency-safe store of bounded per-user histories. The sole mutation
/// path for session state.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_turns: usize,
}

impl SessionStore {
    /// `max_turns` must be >= 1; `RagConfig::validate` enforces this upstream,
    /// the clamp here keeps a hand-constructed store from ever holding an
    /// unbounded or always-empty session.
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Snapshot of the user's turns, oldest first. Empty if the user has no
    /// session yet. Never reflects a partially-applied append.
    pub fn history_of(&self, user_id: &str) -> Vec<Turn> {
        self.sessions
            .get(user_id)
            .map(|s| s.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record one exchange, evicting the oldest turn(s) if the bound is
    /// exceeded. Atomic with respect to concurrent appends and reads on the
    /// same user id.
    pub fn append(&self, user_id: &str, question: &str, answer: &str) {
        let mut session = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, self.max_turns));
        session.push(Turn::new(question, answer));
    }

    /// Current turn count for a user (0 if absent).
    pub fn len(&self, user_id: &str) -> usize {
        self.sessions.get(user_id).map(|s| s.turns.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id) == 0
    }

    /// Number of distinct users with a session.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn history_of_unknown_user_is_empty() {
        let store = SessionStore::new(5);
        assert!(store.history_of("nobody").is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn append_creates_session_lazily() {
        let store = SessionStore::new(5);
        store.append("u1", "q", "a");
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.len("u1"), 1);
    }

    #[test]
    fn history_stays_bounded_after_every_append() {
        let store = SessionStore::new(3);
        for i in 0..10 {
            store.append("u1", &format!("q{}", i), "a");
            assert!(store.len("u1") <= 3);
        }
        assert_eq!(store.len("u1"), 3);
    }

    #[test]
    fn eviction_is_fifo_oldest_first() {
        let store = SessionStore::new(5);
        for i in 1..=6 {
            store.append("u1", &format!("Q{}", i), &format!("A{}", i));
        }
        let history = store.history_of("u1");
        let questions: Vec<&str> = history.iter().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["Q2", "Q3", "Q4", "Q5", "Q6"]);
    }

    #[test]
    fn sessions_are_independent_per_user() {
        let store = SessionStore::new(5);
        store.append("alice", "alice-q1", "a");
        store.append("bob", "bob-q1", "a");
        store.append("alice", "alice-q2", "a");

        let alice = store.history_of("alice");
        let bob = store.history_of("bob");
        assert_eq!(alice.len(), 2);
        assert_eq!(bob.len(), 1);
        assert!(alice.iter().all(|t| t.question.starts_with("alice")));
        assert!(bob.iter().all(|t| t.question.starts_with("bob")));
    }

    #[test]
    fn max_turns_floor_is_one() {
        let store = SessionStore::new(0);
        store.append("u1", "q1", "a1");
        store.append("u1", "q2", "a2");
        assert_eq!(store.len("u1"), 1);
        assert_eq!(store.history_of("u1")[0].question, "q2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_lose_nothing() {
        let store = Arc::new(SessionStore::new(1000));
        let mut handles = Vec::new();
        for task in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    store.append("shared", &format!("t{}-q{}", task, i), "a");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.len("shared"), 400);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_users_never_cross_contaminate() {
        let store = Arc::new(SessionStore::new(100));
        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..50 {
                    store.append("alice", &format!("alice-{}", i), "a");
                }
            })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..50 {
                    store.append("bob", &format!("bob-{}", i), "a");
                }
            })
        };
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();

        assert!(store
            .history_of("alice")
            .iter()
            .all(|t| t.question.starts_with("alice-")));
        assert!(store
            .history_of("bob")
            .iter()
            .all(|t| t.question.starts_with("bob-")));
    }
}
