//! Client facade.
//!
//! [`MassClient`] owns one connection at a time and composes the pieces of
//! the core:
//!
//! - a [`Transport`] session, written through a shared [`SessionWriter`]
//! - one background reader task per connection that routes decoded frames
//! - the [`CorrelationRegistry`] for request/response pairing
//! - the [`ReadinessGate`] released by the server handshake
//! - the [`EventBroadcaster`] for unsolicited server events
//!
//! The client never reconnects on its own. When the connection goes away
//! every outstanding request fails with [`ClientError::ConnectionLost`] and
//! the client returns to [`ConnectionState::Disconnected`], from where the
//! caller may `connect` again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, CommandArgs, CommandEnvelope, InboundMessage, ServerInfo};
use crate::config::ClientConfig;
use crate::endpoint::websocket_url;
use crate::error::{ClientError, ClientResult};
use crate::events::{EventBroadcaster, EventSubscription};
use crate::gate::ReadinessGate;
use crate::protocol_constants::FIRST_MESSAGE_ID;
use crate::registry::{CorrelationRegistry, PendingGuard};
use crate::transport::{FrameStream, SessionWriter, Transport, WsTransport};

/// Connection lifecycle as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Session open, handshake not yet received.
    ConnectedNotReady,
    /// Handshake received; commands may be issued.
    ConnectedReady,
}

impl ConnectionState {
    /// Returns true while a session is open.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::ConnectedNotReady | Self::ConnectedReady)
    }
}

/// A live connection generation.
struct ActiveConnection {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl ActiveConnection {
    /// Stops the reader and waits for its termination path to finish.
    ///
    /// The reader closes the writer itself; the wire close is bounded by the
    /// writer's close timeout.
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.reader.await {
            log::warn!("[Client] Reader task ended abnormally: {}", e);
        }
    }
}

/// Websocket command/event client for the music server.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct MassClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    next_id: AtomicU64,
    registry: Arc<CorrelationRegistry>,
    gate: Arc<ReadinessGate>,
    events: EventBroadcaster,
    server_info: Arc<RwLock<Option<ServerInfo>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    /// Write half of the current generation, if any.
    writer: Arc<RwLock<Option<Arc<SessionWriter>>>>,
    /// Serializes connect and disconnect.
    connection: Mutex<Option<ActiveConnection>>,
}

impl MassClient {
    /// Creates a disconnected client over `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if `config` fails validation.
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> ClientResult<Self> {
        config.validate().map_err(ClientError::InvalidConfig)?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            transport,
            events: EventBroadcaster::new(config.event_capacity),
            config,
            next_id: AtomicU64::new(FIRST_MESSAGE_ID),
            registry: Arc::new(CorrelationRegistry::new()),
            gate: Arc::new(ReadinessGate::new()),
            server_info: Arc::new(RwLock::new(None)),
            state: Arc::new(state),
            writer: Arc::new(RwLock::new(None)),
            connection: Mutex::new(None),
        })
    }

    /// Creates a disconnected client that connects over websockets.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if `config` fails validation.
    pub fn websocket(config: ClientConfig) -> ClientResult<Self> {
        Self::new(Arc::new(WsTransport::new()), config)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a session to `endpoint` and starts its reader task.
    ///
    /// `endpoint` is a `ws(s)://` URL or the server's `http(s)://` base URL.
    /// Returns once the session is open; the handshake arrives later, so
    /// call [`await_ready`](Self::await_ready) before issuing commands.
    /// A no-op when already connected and ready. A connection that is still
    /// waiting for its handshake is torn down and replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] or [`ClientError::Connect`].
    /// The same error fails every pending request and readiness waiter.
    pub async fn connect(&self, endpoint: &str) -> ClientResult<()> {
        let mut connection = self.connection.lock().await;
        if self.state() == ConnectionState::ConnectedReady {
            log::debug!("[Client] Already connected, ignoring connect");
            return Ok(());
        }

        if let Some(previous) = connection.take() {
            log::info!("[Client] Replacing previous connection");
            previous.shutdown().await;
        }

        let url = match websocket_url(endpoint) {
            Ok(url) => url,
            Err(e) => {
                self.fail_connect(&e);
                return Err(e);
            }
        };

        self.state.send_replace(ConnectionState::Connecting);
        log::info!("[Client] Connecting to {}", url);

        let opened =
            match tokio::time::timeout(self.config.connect_timeout, self.transport.open(&url))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::Connect {
                    endpoint: url.clone(),
                    reason: format!(
                        "timed out after {}ms",
                        self.config.connect_timeout.as_millis()
                    ),
                }),
            };
        let session = match opened {
            Ok(session) => session,
            Err(e) => {
                self.fail_connect(&e);
                return Err(e);
            }
        };

        let writer = Arc::new(SessionWriter::new(
            session.sink,
            self.config.connect_timeout,
        ));
        *self.writer.write() = Some(Arc::clone(&writer));
        // Before spawning, so a fast handshake cannot be overwritten.
        self.state.send_replace(ConnectionState::ConnectedNotReady);

        let cancel = CancellationToken::new();
        let reader = tokio::spawn(run_reader(
            self.reader_context(&writer),
            session.frames,
            cancel.clone(),
        ));

        *connection = Some(ActiveConnection { cancel, reader });
        log::info!("[Client] Connected to {}, waiting for handshake", url);
        Ok(())
    }

    /// Closes the current session and waits until its pending requests have
    /// been failed and the readiness gate reset.
    ///
    /// Safe to call any number of times.
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        match connection.take() {
            Some(active) => {
                log::info!("[Client] Disconnecting");
                active.shutdown().await;
            }
            None => log::debug!("[Client] Not connected, nothing to disconnect"),
        }
    }

    fn fail_connect(&self, error: &ClientError) {
        log::warn!("[Client] {}", error);
        self.registry.fail_all(error.clone());
        self.gate.reset(error.clone());
        self.state.send_replace(ConnectionState::Disconnected);
    }

    fn reader_context(&self, writer: &Arc<SessionWriter>) -> ReaderContext {
        ReaderContext {
            registry: Arc::clone(&self.registry),
            gate: Arc::clone(&self.gate),
            events: self.events.clone(),
            server_info: Arc::clone(&self.server_info),
            state: Arc::clone(&self.state),
            writer_slot: Arc::clone(&self.writer),
            writer: Arc::clone(writer),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Readiness
    // ─────────────────────────────────────────────────────────────────────────

    /// Waits for the server handshake of the current connection attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`], or the connect / connection-lost
    /// error that ended the attempt first.
    pub async fn await_ready(&self, timeout: Duration) -> ClientResult<()> {
        self.gate.await_ready(timeout).await
    }

    /// [`await_ready`](Self::await_ready) with the configured ready timeout.
    pub async fn await_ready_default(&self) -> ClientResult<()> {
        self.await_ready(self.config.ready_timeout).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Sends a command without waiting for its result.
    ///
    /// Returns the assigned message id. Any reply the server sends for it is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Encode`] or [`ClientError::Send`].
    pub async fn send_command(&self, command: &str, args: Option<CommandArgs>) -> ClientResult<u64> {
        let id = self.next_message_id();
        let text = codec::encode(&CommandEnvelope::new(command, args).with_message_id(id))?;
        self.current_writer()?.send(text).await?;
        log::debug!("[Client] Sent {} (id {})", command, id);
        Ok(id)
    }

    /// Sends a command and waits up to `timeout` for its result.
    ///
    /// Callers must have awaited readiness first. The client does not wait
    /// for the handshake here; commands written before it may be rejected
    /// or dropped by the server.
    ///
    /// Returns the result payload; a JSON `null` result is `None`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Server`] if the server answered with an error frame
    /// - [`ClientError::Timeout`] if no answer arrived in time
    /// - [`ClientError::ConnectionLost`] if the connection went away first
    /// - [`ClientError::Encode`] / [`ClientError::Send`] if it was never sent
    pub async fn send_command_awaiting_result(
        &self,
        command: &str,
        args: Option<CommandArgs>,
        timeout: Duration,
    ) -> ClientResult<Option<Value>> {
        let id = self.next_message_id();
        let text = codec::encode(&CommandEnvelope::new(command, args).with_message_id(id))?;
        let writer = self.current_writer()?;

        // Register before writing so the reply cannot outrun the slot.
        let slot = self.registry.register(id)?;
        let _guard = PendingGuard::new(id, Arc::clone(&self.registry));

        writer.send(text).await?;
        log::debug!("[Client] Sent {} (id {}), awaiting result", command, id);

        match tokio::time::timeout(timeout, slot).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::ConnectionLost(format!(
                "result slot for {command} dropped"
            ))),
            Err(_) => {
                log::warn!(
                    "[Client] {} (id {}) timed out after {}ms",
                    command,
                    id,
                    timeout.as_millis()
                );
                Err(ClientError::timeout(command, timeout))
            }
        }
    }

    /// [`send_command_awaiting_result`](Self::send_command_awaiting_result)
    /// with the configured command timeout.
    pub async fn send_command_with_default_timeout(
        &self,
        command: &str,
        args: Option<CommandArgs>,
    ) -> ClientResult<Option<Value>> {
        self.send_command_awaiting_result(command, args, self.config.command_timeout)
            .await
    }

    fn next_message_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn current_writer(&self) -> ClientResult<Arc<SessionWriter>> {
        self.writer
            .read()
            .clone()
            .ok_or_else(|| ClientError::Send("not connected".into()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribes to server events published from now on.
    pub fn subscribe_events(&self) -> EventSubscription {
        self.events.subscribe()
    }

    /// Last handshake received. Kept after disconnect.
    #[must_use]
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.server_info.read().clone()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Number of requests waiting for a result.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Drop for MassClient {
    fn drop(&mut self) {
        // The reader runs its own termination path once cancelled.
        if let Some(active) = self.connection.get_mut() {
            active.cancel.cancel();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reader task
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state one reader task routes into.
struct ReaderContext {
    registry: Arc<CorrelationRegistry>,
    gate: Arc<ReadinessGate>,
    events: EventBroadcaster,
    server_info: Arc<RwLock<Option<ServerInfo>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    writer_slot: Arc<RwLock<Option<Arc<SessionWriter>>>>,
    /// This generation's writer.
    writer: Arc<SessionWriter>,
}

async fn run_reader(ctx: ReaderContext, mut frames: FrameStream, cancel: CancellationToken) {
    let reason = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break "disconnected".to_string(),
            frame = frames.next() => match frame {
                Some(Ok(text)) => ctx.handle_frame(&text),
                Some(Err(e)) => break e.to_string(),
                None => break "connection closed".to_string(),
            },
        }
    };
    ctx.terminate(reason).await;
}

impl ReaderContext {
    fn handle_frame(&self, text: &str) {
        let message = match codec::decode(text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("[Client] Dropping frame: {}", e);
                return;
            }
        };

        match message {
            InboundMessage::ServerInfo(info) => {
                let (server_id, version) = (info.server_id.clone(), info.server_version.clone());
                *self.server_info.write() = Some(info);
                if self.gate.signal_ready() {
                    log::info!("[Client] Server {} ready (version {})", server_id, version);
                } else {
                    log::debug!("[Client] Repeated handshake from {}", server_id);
                }
                self.state.send_replace(ConnectionState::ConnectedReady);
            }
            InboundMessage::Event(event) => {
                tracing::debug!(?event, "server_event");
                self.events.publish(event);
            }
            // Replies to fire-and-forget commands and late replies find no
            // entry; the registry logs and drops them.
            InboundMessage::Success(result) => {
                self.registry
                    .resolve_success(result.message_id, result.result);
            }
            InboundMessage::Error(result) => {
                let id = result.message_id;
                self.registry.resolve_error(id, result.into_error());
            }
            InboundMessage::Unrecognized(value) => {
                log::warn!("[Client] Dropping unrecognized frame: {}", value);
            }
        }
    }

    /// Tears the generation down. Callers are released before any wire I/O.
    async fn terminate(self, reason: String) {
        log::info!("[Client] Reader stopped: {}", reason);
        {
            let mut slot = self.writer_slot.write();
            if slot.as_ref().is_some_and(|w| Arc::ptr_eq(w, &self.writer)) {
                *slot = None;
            }
        }
        let owns_close = self.writer.reject_sends();

        let lost = ClientError::ConnectionLost(reason);
        self.registry.fail_all(lost.clone());
        self.gate.reset(lost);
        self.state.send_replace(ConnectionState::Disconnected);

        if owns_close {
            self.writer.close_wire().await;
        }
    }
}
