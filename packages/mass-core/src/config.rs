//! Client configuration.

use std::time::Duration;

use crate::protocol_constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_EVENT_CAPACITY,
    DEFAULT_READY_TIMEOUT_MS,
};

/// Timeouts and buffer sizes for [`MassClient`](crate::MassClient).
///
/// All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum time to wait for the transport to open.
    pub connect_timeout: Duration,

    /// Default time to wait for the server handshake.
    pub ready_timeout: Duration,

    /// Default time to wait for a command result.
    pub command_timeout: Duration,

    /// Events buffered per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the default readiness timeout.
    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Sets the default command timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the per-subscriber event buffer.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_capacity == 0 {
            return Err(
                "event_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            ready_timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
