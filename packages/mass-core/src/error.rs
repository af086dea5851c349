//! Centralized error types for the client core.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps every error to a machine-readable code for UI display
//! - Keeps errors `Clone` so a single failure can complete many waiters

use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Error type for every client operation.
///
/// Variants map onto the failure classes of the command/event protocol:
/// connecting, writing, waiting, server-side rejection, undecodable frames
/// and losing the connection while requests are outstanding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Opening the transport failed.
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect {
        /// The endpoint that was being opened.
        endpoint: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The endpoint URL could not be turned into a websocket URL.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Writing a frame failed, or there is no live session to write to.
    #[error("Send failed: {0}")]
    Send(String),

    /// A command envelope could not be serialized.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// An awaited response or the handshake did not arrive in time.
    #[error("Timed out after {timeout_ms}ms waiting for {context}")]
    Timeout {
        /// What was being waited for.
        context: String,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The server answered a command with an error frame.
    ///
    /// Code and details are passed through verbatim.
    #[error("Server error [{code}]: {}", details.as_deref().unwrap_or("no details"))]
    Server {
        /// Server-provided error code.
        code: String,
        /// Optional server-provided details.
        details: Option<String>,
    },

    /// An inbound frame could not be parsed or did not match its shape.
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// The reader loop terminated while the operation was outstanding.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A correlation id was registered twice while still outstanding.
    #[error("Duplicate request id: {0}")]
    DuplicateRequest(u64),

    /// The client configuration was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Builds a [`ClientError::Timeout`] from a duration.
    pub fn timeout(context: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            context: context.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns true if this error was caused by the connection going away
    /// (connect failure or loss), as opposed to a per-request failure.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::InvalidEndpoint(_) | Self::ConnectionLost(_)
        )
    }

    /// Returns true for [`ClientError::Timeout`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl ErrorCode for ClientError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect_failed",
            Self::InvalidEndpoint(_) => "invalid_endpoint",
            Self::Send(_) => "send_failed",
            Self::Encode(_) => "encode_failed",
            Self::Timeout { .. } => "timeout",
            Self::Server { .. } => "server_error",
            Self::ProtocolDecode(_) => "protocol_decode",
            Self::ConnectionLost(_) => "connection_lost",
            Self::DuplicateRequest(_) => "duplicate_request",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::ProtocolDecode(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

/// Convenient Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn server_error_displays_code_and_details() {
        let err = ClientError::Server {
            code: "invalid_command".into(),
            details: Some("no such command".into()),
        };
        assert_eq!(
            err.to_string(),
            "Server error [invalid_command]: no such command"
        );
        assert_eq!(err.code(), "server_error");
    }

    #[test]
    fn server_error_without_details() {
        let err = ClientError::Server {
            code: "oops".into(),
            details: None,
        };
        assert_eq!(err.to_string(), "Server error [oops]: no details");
    }

    #[test]
    fn timeout_helper_records_millis() {
        let err = ClientError::timeout("players/all", Duration::from_millis(50));
        assert_eq!(
            err,
            ClientError::Timeout {
                context: "players/all".into(),
                timeout_ms: 50
            }
        );
        assert!(err.is_timeout());
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn connection_failures_are_classified() {
        assert!(ClientError::ConnectionLost("gone".into()).is_connection_failure());
        assert!(ClientError::Connect {
            endpoint: "ws://h/ws".into(),
            reason: "refused".into()
        }
        .is_connection_failure());
        assert!(!ClientError::Send("closed".into()).is_connection_failure());
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err: ClientError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), "protocol_decode");
    }
}
