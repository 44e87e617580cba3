//! Streaming response support.
//!
//! Provides fragment streaming for the mentor's incremental replies.

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::backend::traits::{BackendError, ContentResponse, FinishReason, Usage};

/// A fragment of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Text content
    pub content: String,
    /// Whether this is the final fragment
    pub is_final: bool,
    /// Finish reason (only on final fragment)
    pub finish_reason: Option<FinishReason>,
}

impl Fragment {
    /// Create a content fragment.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_final: false,
            finish_reason: None,
        }
    }

    /// Create a final fragment.
    pub fn final_fragment(content: impl Into<String>, reason: FinishReason) -> Self {
        Self {
            content: content.into(),
            is_final: true,
            finish_reason: Some(reason),
        }
    }
}

type FragmentResult = Result<Fragment, BackendError>;

pin_project! {
    /// Lazy, finite stream of reply fragments.
    ///
    /// Dropping the stream or calling [`FragmentStream::cancel`] closes the
    /// channel, so the producer's next send fails and it stops.
    pub struct FragmentStream {
        #[pin]
        receiver: mpsc::Receiver<FragmentResult>,
        accumulated: String,
        complete: bool,
        cancelled: bool,
        usage: Option<Usage>,
    }
}

impl FragmentStream {
    /// Create a new fragment stream.
    pub fn new(receiver: mpsc::Receiver<FragmentResult>) -> Self {
        Self {
            receiver,
            accumulated: String::new(),
            complete: false,
            cancelled: false,
            usage: None,
        }
    }

    /// Create a stream from a complete response (for non-streaming backends).
    pub fn from_complete(response: ContentResponse) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh channel, so this cannot fail
        let _ = tx.try_send(Ok(Fragment::final_fragment(
            response.text,
            response.finish_reason,
        )));

        Self {
            usage: Some(response.usage),
            ..Self::new(rx)
        }
    }

    /// Create a stream that yields a fixed sequence of fragments.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        let last = fragments.len().saturating_sub(1);
        for (i, text) in fragments.into_iter().enumerate() {
            let fragment = if i == last {
                Fragment::final_fragment(text, FinishReason::Stop)
            } else {
                Fragment::content(text)
            };
            let _ = tx.try_send(Ok(fragment));
        }
        Self::new(rx)
    }

    /// Create a stream that yields a single error.
    pub fn from_error(error: BackendError) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Err(error));
        Self::new(rx)
    }

    /// Create a sender/receiver pair for streaming.
    pub fn channel(buffer: usize) -> (FragmentSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        let sender = FragmentSender { sender: tx };
        let stream = Self::new(rx);
        (sender, stream)
    }

    /// Get accumulated content so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Check if stream is complete.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the consumer cancelled the stream.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Get usage (available after stream completes).
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// Stop consuming. The producer sees a closed channel on its next send
    /// and no further fragments are yielded.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.receiver.close();
            self.cancelled = true;
            self.complete = true;
            tracing::debug!(
                accumulated = self.accumulated.len(),
                "Fragment stream cancelled"
            );
        }
    }

    /// Drain the stream into a complete response.
    ///
    /// The first error ends collection and is returned; fragments seen
    /// before it are discarded with the stream.
    pub async fn collect(mut self) -> Result<ContentResponse, BackendError> {
        use futures::StreamExt;

        let mut finish_reason = FinishReason::Stop;

        while let Some(item) = self.next().await {
            let fragment = item?;
            if let Some(reason) = fragment.finish_reason {
                finish_reason = reason;
            }
        }

        Ok(ContentResponse {
            text: self.accumulated,
            inline_data: Vec::new(),
            finish_reason,
            usage: self.usage.unwrap_or_default(),
        })
    }
}

impl Stream for FragmentStream {
    type Item = FragmentResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.cancelled {
            return Poll::Ready(None);
        }

        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.accumulated.push_str(&fragment.content);

                if fragment.is_final {
                    *this.complete = true;
                }

                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(e))) => {
                *this.complete = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                *this.complete = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("accumulated", &self.accumulated)
            .field("complete", &self.complete)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Sender for a fragment stream.
#[derive(Debug, Clone)]
pub struct FragmentSender {
    sender: mpsc::Sender<FragmentResult>,
}

impl FragmentSender {
    /// Send a content fragment.
    pub async fn send(&self, content: impl Into<String>) -> Result<(), StreamError> {
        self.sender
            .send(Ok(Fragment::content(content)))
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Send the final fragment.
    pub async fn finish(
        self,
        content: impl Into<String>,
        reason: FinishReason,
    ) -> Result<(), StreamError> {
        self.sender
            .send(Ok(Fragment::final_fragment(content, reason)))
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Deliver a failure and end the stream.
    pub async fn fail(self, error: BackendError) -> Result<(), StreamError> {
        self.sender
            .send(Err(error))
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Error during streaming.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Stream was closed
    #[error("Stream closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_fragment_stream() {
        let (sender, mut stream) = FragmentStream::channel(10);

        tokio::spawn(async move {
            sender.send("Hello").await.unwrap();
            sender.send(", ").await.unwrap();
            sender.send("world").await.unwrap();
            sender.finish("!", FinishReason::Stop).await.unwrap();
        });

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }

        assert_eq!(fragments.len(), 4);
        assert_eq!(stream.accumulated(), "Hello, world!");
        assert!(stream.is_complete());
    }

    #[tokio::test]
    async fn test_from_complete() {
        let stream = FragmentStream::from_complete(ContentResponse::text("Complete response"));
        let collected = stream.collect().await.unwrap();
        assert_eq!(collected.text, "Complete response");
    }

    #[tokio::test]
    async fn test_from_fragments() {
        let mut stream = FragmentStream::from_fragments(["Focus ", "on ", "Raft."]);
        let mut count = 0;
        while let Some(fragment) = stream.next().await {
            let fragment = fragment.unwrap();
            count += 1;
            assert_eq!(fragment.is_final, count == 3);
        }
        assert_eq!(stream.accumulated(), "Focus on Raft.");
    }

    #[tokio::test]
    async fn test_cancel_stops_producer() {
        let (sender, mut stream) = FragmentStream::channel(1);

        let producer = tokio::spawn(async move {
            let mut sent = 0u32;
            loop {
                if sender.send("tick ").await.is_err() {
                    break;
                }
                sent += 1;
            }
            sent
        });

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content, "tick ");
        stream.cancel();

        assert!(stream.next().await.is_none());
        assert!(stream.is_cancelled());
        assert!(stream.is_complete());

        // Producer observes the closed channel and exits
        let sent = producer.await.unwrap();
        assert!(sent >= 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_closes_sender() {
        let (sender, stream) = FragmentStream::channel(4);
        drop(stream);
        assert!(sender.is_closed());
        assert!(matches!(sender.send("late").await, Err(StreamError::Closed)));
    }

    #[tokio::test]
    async fn test_error_ends_collect() {
        let (sender, stream) = FragmentStream::channel(4);
        tokio::spawn(async move {
            sender.send("partial").await.unwrap();
            sender
                .fail(BackendError::NetworkError("reset".to_string()))
                .await
                .unwrap();
        });

        let err = stream.collect().await.unwrap_err();
        assert_eq!(err, BackendError::NetworkError("reset".to_string()));
    }
}
