//! Readiness gate tied to the server handshake.
//!
//! The gate holds one `ReadyLatch` per connection attempt. A latch moves
//! from pending to ready when the handshake arrives, or from pending to
//! failed when the connection goes away first. Resetting the gate installs a
//! fresh latch instead of rewinding the old one, so a caller that was
//! already waiting always sees the terminal outcome of the attempt it was
//! waiting on.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
enum LatchState {
    Pending,
    Ready,
    Failed(ClientError),
}

/// Set-once cell with any number of waiters.
struct ReadyLatch {
    state: watch::Sender<LatchState>,
}

impl ReadyLatch {
    fn new() -> Self {
        let (state, _) = watch::channel(LatchState::Pending);
        Self { state }
    }

    /// Moves pending to `next`. Returns false if already terminal.
    fn settle(&self, next: LatchState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LatchState::Pending {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn is_ready(&self) -> bool {
        *self.state.borrow() == LatchState::Ready
    }

    async fn wait(&self) -> ClientResult<()> {
        let mut rx = self.state.subscribe();
        let result = match rx.wait_for(|state| *state != LatchState::Pending).await {
            Ok(state) => match &*state {
                LatchState::Failed(e) => Err(e.clone()),
                _ => Ok(()),
            },
            // The sender lives in `self`, which we borrow.
            Err(_) => Err(ClientError::ConnectionLost(
                "readiness latch dropped".into(),
            )),
        };
        result
    }
}

/// Single-shot readiness signal, replaced on every reset.
pub struct ReadinessGate {
    current: RwLock<Arc<ReadyLatch>>,
}

impl ReadinessGate {
    /// Creates a gate with a fresh pending latch.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(ReadyLatch::new())),
        }
    }

    /// Waits until the current latch is ready.
    ///
    /// # Errors
    ///
    /// Returns the error the latch was failed with (connect failure or
    /// connection loss), or [`ClientError::Timeout`] if neither outcome
    /// arrives within `timeout`.
    pub async fn await_ready(&self, timeout: Duration) -> ClientResult<()> {
        let latch = Arc::clone(&self.current.read());
        match tokio::time::timeout(timeout, latch.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!(
                    "[Gate] Timed out after {}ms waiting for server handshake",
                    timeout.as_millis()
                );
                Err(ClientError::timeout("server handshake", timeout))
            }
        }
    }

    /// Marks the current latch ready.
    ///
    /// Returns true on the first call after a reset; later calls are no-ops.
    pub fn signal_ready(&self) -> bool {
        self.current.read().settle(LatchState::Ready)
    }

    /// Fails the current latch if it is still pending, then installs a fresh
    /// one for the next connection attempt.
    pub fn reset(&self, error: ClientError) {
        let mut current = self.current.write();
        if current.settle(LatchState::Failed(error.clone())) {
            log::info!("[Gate] Readiness failed before handshake: {}", error);
        }
        *current = Arc::new(ReadyLatch::new());
    }

    /// Returns true if the current latch is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.current.read().is_ready()
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
