//! In-process transport.
//!
//! [`MemoryTransport`] hands every opened session to a [`MemoryListener`],
//! which yields the server side of it as a [`MemoryPeer`]. Nothing touches
//! the network, which makes it suitable for driving the client in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{FrameSink, Session, Transport};
use crate::error::{ClientError, ClientResult};

struct Shared {
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
    refusing: AtomicBool,
}

/// Client side of the in-process transport. Clones share one listener.
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Creates a transport and the listener that receives its sessions.
    pub fn new() -> (Self, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let transport = Self {
            shared: Arc::new(Shared {
                accept_tx,
                refusing: AtomicBool::new(false),
            }),
        };
        (transport, MemoryListener { accept_rx })
    }

    /// While set, every `open` fails with [`ClientError::Connect`].
    pub fn set_refusing(&self, refusing: bool) {
        self.shared.refusing.store(refusing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, endpoint: &str) -> ClientResult<Session> {
        let refused = |reason: &str| ClientError::Connect {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };
        if self.shared.refusing.load(Ordering::SeqCst) {
            return Err(refused("connection refused"));
        }

        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            endpoint: endpoint.to_string(),
            to_client: Some(to_client),
            from_client,
        };
        self.shared
            .accept_tx
            .send(peer)
            .map_err(|_| refused("listener is gone"))?;

        Ok(Session::new(
            Box::new(MemorySink { tx: Some(client_tx) }),
            Box::pin(UnboundedReceiverStream::new(client_rx)),
        ))
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, text: String) -> ClientResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ClientError::Send("sink is closed".into()))?;
        tx.send(text)
            .map_err(|_| ClientError::Send("peer is gone".into()))
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.tx = None;
        Ok(())
    }
}

/// Accepts sessions opened through the paired [`MemoryTransport`].
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next session. `None` once every transport clone is gone.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }
}

/// Server side of one in-process session.
///
/// Dropping the peer ends the client's inbound stream.
pub struct MemoryPeer {
    endpoint: String,
    to_client: Option<mpsc::UnboundedSender<ClientResult<String>>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// The endpoint the client opened.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Pushes a text frame to the client. Returns false if it is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Ok(text.into())).is_ok(),
            None => false,
        }
    }

    /// Pushes `value` serialized as a text frame.
    pub fn send_json(&self, value: &Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Next frame written by the client, or `None` once it closed its sink.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Like [`recv`](Self::recv), parsed as JSON. Non-JSON frames yield `None`.
    pub async fn recv_json(&mut self) -> Option<Value> {
        let text = self.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Ends the client's inbound stream cleanly.
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Delivers a read error to the client, then ends its inbound stream.
    pub fn fail(&mut self, error: ClientError) {
        if let Some(tx) = self.to_client.take() {
            let _ = tx.send(Err(error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (transport, mut listener) = MemoryTransport::new();
        let mut session = transport.open("ws://box:8095/ws").await.unwrap();
        let mut peer = listener.accept().await.unwrap();
        assert_eq!(peer.endpoint(), "ws://box:8095/ws");

        session.sink.send("{\"command\":\"players/all\"}".into()).await.unwrap();
        assert_eq!(
            peer.recv_json().await,
            Some(json!({"command": "players/all"}))
        );

        assert!(peer.send_json(&json!({"event": "player_updated"})));
        let frame = session.frames.next().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"event":"player_updated"}"#);
    }

    #[tokio::test]
    async fn refusing_transport_fails_open() {
        let (transport, _listener) = MemoryTransport::new();
        transport.set_refusing(true);
        let err = transport.open("ws://box/ws").await.err().unwrap();
        assert!(err.is_connection_failure());
    }

    #[tokio::test]
    async fn peer_close_and_fail_end_the_stream() {
        let (transport, mut listener) = MemoryTransport::new();

        let mut session = transport.open("ws://a/ws").await.unwrap();
        let mut peer = listener.accept().await.unwrap();
        peer.close();
        assert!(session.frames.next().await.is_none());

        let mut session = transport.open("ws://b/ws").await.unwrap();
        let mut peer = listener.accept().await.unwrap();
        peer.fail(ClientError::ConnectionLost("reset".into()));
        assert!(matches!(
            session.frames.next().await,
            Some(Err(ClientError::ConnectionLost(_)))
        ));
        assert!(session.frames.next().await.is_none());
    }
}
