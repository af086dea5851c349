//! Correlation of outstanding requests with their responses.
//!
//! This module provides:
//!
//! - `CorrelationRegistry`: maps correlation ids to single-use result slots
//! - `PendingGuard`: RAII guard that removes an entry when its waiter goes away
//!
//! Every entry is completed at most once. Completion removes the entry from
//! the map and consumes its `oneshot` sender, so a duplicate or late frame
//! for the same id finds nothing and is ignored.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{ClientError, ClientResult};

/// Outcome delivered to a pending request.
pub type PendingResult = ClientResult<Option<Value>>;

/// Receiving half of a registered request.
pub type PendingSlot = oneshot::Receiver<PendingResult>;

/// Shared table of outstanding requests.
///
/// Safe to use concurrently from callers (register, remove) and from the
/// reader loop (resolve, fail all).
pub struct CorrelationRegistry {
    pending: DashMap<u64, oneshot::Sender<PendingResult>>,
}

impl CorrelationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Registers a result slot for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DuplicateRequest`] if `id` is still outstanding.
    pub fn register(&self, id: u64) -> ClientResult<PendingSlot> {
        let rx = match self.pending.entry(id) {
            Entry::Occupied(_) => return Err(ClientError::DuplicateRequest(id)),
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(tx);
                rx
            }
        };
        // Shard lock is released here; len() takes every shard's read lock.
        log::trace!("[Registry] Registered {} (pending: {})", id, self.len());
        Ok(rx)
    }

    /// Completes `id` with a successful result.
    ///
    /// Returns false if nothing was waiting for `id`.
    pub fn resolve_success(&self, id: u64, value: Option<Value>) -> bool {
        self.complete(id, Ok(value))
    }

    /// Completes `id` with an error.
    ///
    /// Returns false if nothing was waiting for `id`.
    pub fn resolve_error(&self, id: u64, error: ClientError) -> bool {
        self.complete(id, Err(error))
    }

    fn complete(&self, id: u64, outcome: PendingResult) -> bool {
        let Some((_, tx)) = self.pending.remove(&id) else {
            log::debug!("[Registry] No pending request for id {}", id);
            return false;
        };
        if tx.send(outcome).is_err() {
            // Waiter dropped between our remove and send; nothing to deliver.
            log::debug!("[Registry] Waiter for id {} already gone", id);
        }
        true
    }

    /// Fails every outstanding request with `error` and empties the table.
    ///
    /// Returns the number of requests that were failed.
    pub fn fail_all(&self, error: ClientError) -> usize {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if self.complete(id, Err(error.clone())) {
                failed += 1;
            }
        }
        if failed > 0 {
            log::info!("[Registry] Failed {} pending request(s): {}", failed, error);
        }
        failed
    }

    /// Removes `id` without completing it.
    ///
    /// Used when the waiter gives up (timeout, cancellation, write failure).
    pub fn remove(&self, id: u64) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Returns true if `id` is outstanding.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Returns the number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that unregisters a request when dropped.
///
/// Held by the awaiting caller so the entry is cleaned up on timeout and
/// when the caller's future is dropped mid-await. Dropping after the entry
/// was resolved is a no-op.
pub struct PendingGuard {
    id: u64,
    registry: Arc<CorrelationRegistry>,
}

impl PendingGuard {
    /// Creates a guard for an id that is already registered.
    pub fn new(id: u64, registry: Arc<CorrelationRegistry>) -> Self {
        Self { id, registry }
    }

    /// Returns the guarded id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.registry.remove(self.id) {
            log::debug!("[Registry] Abandoned pending request {}", self.id);
        }
    }
}
