//! Websocket transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{FrameSink, Session, Transport};
use crate::error::{ClientError, ClientResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens websocket sessions.
///
/// Built without a TLS backend: `wss://` endpoints fail to open with
/// [`ClientError::Connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, endpoint: &str) -> ClientResult<Session> {
        let (ws, response) = connect_async(endpoint)
            .await
            .map_err(|e| ClientError::Connect {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        log::debug!(
            "[WS] Handshake with {} completed (HTTP {})",
            endpoint,
            response.status()
        );

        let (sink, stream) = ws.split();

        let frames = stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        log::warn!("[WS] Dropping non-UTF-8 binary frame ({} bytes)", bytes.len());
                        None
                    }
                },
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|f| format!("closed by server ({}): {}", f.code, f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                    Some(Err(ClientError::ConnectionLost(reason)))
                }
                // Pings are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
                Err(e) => Some(Err(ClientError::ConnectionLost(e.to_string()))),
            }
        });

        Ok(Session::new(Box::new(WsSink { sink }), Box::pin(frames)))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> ClientResult<()> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ClientError::Send(e.to_string()))
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.sink
            .close()
            .await
            .map_err(|e| ClientError::Send(e.to_string()))
    }
}
