//! Mass Core - command/event client for the music server.
//!
//! This crate holds the protocol and concurrency core of the client: one
//! persistent websocket connection over which many commands run concurrently,
//! correlated with their results by message id, while unsolicited server
//! events fan out to any number of subscribers.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`transport`]: Session abstraction plus websocket and in-memory transports
//! - [`codec`]: Command encoding and structural classification of inbound frames
//! - [`registry`]: Correlation of outstanding requests with their results
//! - [`gate`]: Readiness gate released by the server handshake
//! - [`events`]: Fan-out of server events
//! - [`client`]: The [`MassClient`] facade composing all of the above
//! - [`api`]: Typed commands for players, queues and the library
//! - [`endpoint`]: Server URL handling and image proxy URLs
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`Transport`](transport::Transport): Opening sessions to a server
//! - [`FrameSink`](transport::FrameSink): Writing frames to an open session
//!
//! [`WsTransport`] is the production implementation;
//! [`MemoryTransport`](transport::memory::MemoryTransport) drives the client
//! in-process for tests.

#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod gate;
pub mod protocol_constants;
pub mod registry;
pub mod transport;

// Re-export commonly used types at the crate root
pub use api::{LibraryQuery, MassApi, MediaType, PlayMedia, QueueOption, RepeatMode};
pub use client::{ConnectionState, MassClient};
pub use codec::{CommandArgs, ServerEvent, ServerInfo};
pub use config::ClientConfig;
pub use endpoint::ServerEndpoint;
pub use error::{ClientError, ClientResult, ErrorCode};
pub use events::{EventBroadcaster, EventSubscription};
pub use transport::{Transport, WsTransport};
