//! Transport abstraction for the client.
//!
//! A [`Transport`] opens one [`Session`] per connection. The session is split
//! into a write half ([`FrameSink`], shared through [`SessionWriter`]) and an
//! ordered stream of inbound text frames. The stream ending, or yielding an
//! error, means the connection is gone. Reconnection is not handled here.
//!
//! Implementations:
//! - [`WsTransport`]: websocket over `tokio-tungstenite`
//! - [`memory::MemoryTransport`]: in-process pair for tests and embedding

pub mod memory;
mod ws;

pub use ws::WsTransport;

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::Mutex;

use crate::error::{ClientError, ClientResult};

/// Ordered inbound text frames of one session.
pub type FrameStream = Pin<Box<dyn Stream<Item = ClientResult<String>> + Send>>;

/// Opens sessions to a server endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session to `endpoint` (a `ws://` or `wss://` URL).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection cannot be made.
    async fn open(&self, endpoint: &str) -> ClientResult<Session>;
}

/// Write half of a session.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes one text frame.
    async fn send(&mut self, text: String) -> ClientResult<()>;

    /// Closes the write half (best-effort on the wire).
    async fn close(&mut self) -> ClientResult<()>;
}

/// An open connection: write half plus inbound frames.
pub struct Session {
    pub sink: Box<dyn FrameSink>,
    pub frames: FrameStream,
}

impl Session {
    /// Creates a session from its two halves.
    pub fn new(sink: Box<dyn FrameSink>, frames: FrameStream) -> Self {
        Self { sink, frames }
    }
}

/// Shared, closable write half.
///
/// Callers send concurrently through an `Arc<SessionWriter>`; frames are
/// written one at a time. Once closed, every send fails with
/// [`ClientError::Send`]. Closing the wire is bounded by `close_timeout`, so
/// a stalled socket or a send stuck holding the sink cannot hold up teardown.
pub struct SessionWriter {
    sink: Mutex<Box<dyn FrameSink>>,
    closed: AtomicBool,
    close_timeout: Duration,
}

impl SessionWriter {
    /// Wraps a sink.
    pub fn new(sink: Box<dyn FrameSink>, close_timeout: Duration) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
            close_timeout,
        }
    }

    /// Writes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] if the writer is closed or the
    /// underlying write fails.
    pub async fn send(&self, text: String) -> ClientResult<()> {
        if self.is_closed() {
            return Err(ClientError::Send("session is closed".into()));
        }
        let mut sink = self.sink.lock().await;
        // Re-check: close() may have run while we waited for the lock.
        if self.is_closed() {
            return Err(ClientError::Send("session is closed".into()));
        }
        sink.send(text).await
    }

    /// Closes the writer. Idempotent; wire errors are logged, not returned.
    pub async fn close(&self) {
        if self.reject_sends() {
            self.close_wire().await;
        }
    }

    /// Makes every later send fail without touching the wire.
    ///
    /// Returns true for the call that closed the writer. That caller owns
    /// the wire close and must follow up with [`close_wire`](Self::close_wire).
    pub fn reject_sends(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    /// Closes the sink on the wire, giving up after `close_timeout`.
    pub async fn close_wire(&self) {
        let close = async {
            let mut sink = self.sink.lock().await;
            sink.close().await
        };
        match tokio::time::timeout(self.close_timeout, close).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::debug!("[Transport] Close on the wire failed: {}", e),
            Err(_) => log::warn!(
                "[Transport] Close on the wire did not finish within {}ms, abandoning it",
                self.close_timeout.as_millis()
            ),
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_rejects_sends_after_close() {
        let (transport, mut listener) = memory::MemoryTransport::new();
        let session = transport.open("ws://test/ws").await.unwrap();
        let mut peer = listener.accept().await.unwrap();

        let writer = SessionWriter::new(session.sink, Duration::from_secs(1));
        writer.send("one".into()).await.unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("one"));

        writer.close().await;
        writer.close().await;
        assert!(writer.is_closed());
        assert!(matches!(
            writer.send("two".into()).await,
            Err(ClientError::Send(_))
        ));
        assert_eq!(peer.recv().await, None);
    }

    struct StalledSink;

    #[async_trait]
    impl FrameSink for StalledSink {
        async fn send(&mut self, _text: String) -> ClientResult<()> {
            std::future::pending().await
        }

        async fn close(&mut self) -> ClientResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_gives_up_on_a_stalled_sink() {
        let writer = std::sync::Arc::new(SessionWriter::new(
            Box::new(StalledSink),
            Duration::from_millis(100),
        ));

        // A send that never finishes holds the sink lock.
        let stuck = {
            let writer = std::sync::Arc::clone(&writer);
            tokio::spawn(async move { writer.send("stuck".into()).await })
        };
        tokio::task::yield_now().await;

        let started = tokio::time::Instant::now();
        writer.close().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(writer.is_closed());
        assert!(!writer.reject_sends());
        stuck.abort();
    }
}
