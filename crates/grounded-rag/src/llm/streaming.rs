//! Streaming fragment handling for generation backends.

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Ordered, finite sequence of answer fragments. Not restartable; a fresh
/// backend call is required to regenerate.
pub struct TokenStream {
    receiver: mpsc::Receiver<String>,
}

impl TokenStream {
    pub fn new(receiver: mpsc::Receiver<String>) -> Self {
        Self { receiver }
    }

    /// Next fragment, or `None` once the producer is done.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Drain the stream, concatenating fragments into the full answer text.
    pub async fn collect(self) -> String {
        self.fold(String::new(), |mut answer, fragment| async move {
            answer.push_str(&fragment);
            answer
        })
        .await
    }
}

impl Stream for TokenStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.receiver.len(), None)
    }
}
