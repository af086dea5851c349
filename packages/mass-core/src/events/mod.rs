//! Fan-out of unsolicited server events.
//!
//! This module provides:
//! - [`EventBroadcaster`] which the reader loop publishes into
//! - [`EventSubscription`], an independent per-subscriber stream
//! - [`names`], well-known event names sent by the server
//!
//! Delivery is live-only: a subscriber sees events published after it
//! subscribed and nothing earlier. Each subscriber has a bounded buffer; when
//! it falls behind, the oldest events are dropped for that subscriber and it
//! resumes from the oldest one still buffered. Publishing never waits for a
//! subscriber.

pub mod names;

use std::collections::HashSet;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::codec::ServerEvent;

/// Publishes server events to every current subscriber.
///
/// Cheap to clone; clones share the same channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. [`ClientConfig::validate`](crate::ClientConfig::validate)
    /// rejects that value before a client is built.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Sends `event` to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it (0 is fine).
    pub fn publish(&self, event: ServerEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(e) => {
                log::trace!("[Events] No subscribers for {}", e.0.event);
                0
            }
        }
    }

    /// Returns a new subscription starting at the next published event.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            inner: BroadcastStream::new(self.tx.subscribe()),
            filter: None,
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's view of the event stream.
///
/// Use [`recv`](Self::recv) or consume it as a [`Stream`]. The stream ends
/// when the broadcaster (and every clone of it) is dropped.
pub struct EventSubscription {
    inner: BroadcastStream<ServerEvent>,
    /// Lowercased event names to keep; `None` keeps everything.
    filter: Option<HashSet<String>>,
}

impl EventSubscription {
    /// Narrows the subscription to the given event names.
    ///
    /// Matching is case-insensitive.
    #[must_use]
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: HashSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_ascii_lowercase())
            .collect();
        self.filter = Some(names);
        self
    }

    /// Receives the next matching event, or `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.next().await
    }

    fn accepts(&self, event: &ServerEvent) -> bool {
        match &self.filter {
            Some(names) => names.contains(&event.event.to_ascii_lowercase()),
            None => true,
        }
    }
}

impl Stream for EventSubscription {
    type Item = ServerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.accepts(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(missed)))) => {
                    log::warn!(
                        "[Events] Subscriber fell behind, dropped {} event(s)",
                        missed
                    );
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
