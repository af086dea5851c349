//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the server's websocket API and changing them
//! would break wire compatibility.

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket API
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the websocket API relative to the server base URL.
pub const WS_PATH: &str = "/ws";

/// Path of the image proxy relative to the server base URL.
///
/// Used for artwork whose path is local to the server or not remotely
/// accessible.
pub const IMAGE_PROXY_PATH: &str = "/imageproxy";

/// First correlation id handed out by a fresh client.
pub const FIRST_MESSAGE_ID: u64 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Wire field names
// ─────────────────────────────────────────────────────────────────────────────

/// Correlation id field, outbound and inbound.
pub const FIELD_MESSAGE_ID: &str = "message_id";

/// Server identity field of the handshake frame.
pub const FIELD_SERVER_ID: &str = "server_id";

/// Server version field of the handshake frame.
pub const FIELD_SERVER_VERSION: &str = "server_version";

/// Event name field of push frames.
pub const FIELD_EVENT: &str = "event";

/// Result field of success frames.
pub const FIELD_RESULT: &str = "result";

/// Error code field of error frames.
pub const FIELD_ERROR_CODE: &str = "error_code";

// ─────────────────────────────────────────────────────────────────────────────
// Timing defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default time to wait for the server handshake (milliseconds).
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 15_000;

/// Default time to wait for a command result (milliseconds).
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// Default time to wait for the transport to open (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default number of events buffered per subscriber before the oldest are
/// dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
