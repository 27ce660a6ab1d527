// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Registry of in-flight relayed generations.
//
// Maps request ids to the abort handle of their upstream stream so a request
// can be stopped individually (single cancel, client disconnect) or all at
// once (global cancel, shutdown drain). Holding an entry means the relay still
// wants bytes from that upstream; aborting severs that interest.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::AbortHandle;

// ---------------------------------------------------------------------------
// Abort capability
// ---------------------------------------------------------------------------

/// Error raised when an upstream stream could not be aborted.
#[derive(Debug, thiserror::Error)]
#[error("failed to abort upstream stream: {0}")]
pub struct AbortError(pub String);

/// Capability to stop delivery from an upstream stream.
///
/// Aborting is best-effort: it stops local consumption and lets the upstream
/// notice the dropped connection, but never waits for acknowledgement.
pub trait StreamAbort: Send + Sync {
    fn abort(&self) -> Result<(), AbortError>;
}

impl StreamAbort for AbortHandle {
    fn abort(&self) -> Result<(), AbortError> {
        AbortHandle::abort(self);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entries and errors
// ---------------------------------------------------------------------------

/// Registry record for one active request.
pub struct ActiveRequestEntry {
    pub request_id: String,
    pub handle: Box<dyn StreamAbort>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for ActiveRequestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRequestEntry")
            .field("request_id", &self.request_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("request id \"{0}\" is already registered")]
    DuplicateRequest(String),
}

/// Outcome of a bulk cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelSummary {
    /// Entries removed from the registry.
    pub cancelled: usize,
    /// Entries whose abort reported an error (still removed).
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// RequestRegistry
// ---------------------------------------------------------------------------

/// Concurrent id → upstream-handle map shared by all request handlers.
///
/// Created once at process start, shared via `Arc`, and drained on shutdown.
#[derive(Default)]
pub struct RequestRegistry {
    entries: DashMap<String, ActiveRequestEntry>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `handle` under `id`.
    pub fn register(
        &self,
        id: impl Into<String>,
        handle: Box<dyn StreamAbort>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateRequest(id)),
            Entry::Vacant(slot) => {
                slot.insert(ActiveRequestEntry {
                    request_id: id,
                    handle,
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    /// Abort and remove the entry for `id`.
    ///
    /// Returns false when no such entry exists. Abort failures are logged;
    /// the entry is removed regardless.
    pub fn cancel(&self, id: &str) -> bool {
        let Some((_, entry)) = self.entries.remove(id) else {
            return false;
        };
        if let Err(e) = entry.handle.abort() {
            tracing::warn!(request_id = %id, error = %e, "abort failed during cancel");
        }
        tracing::info!(
            request_id = %id,
            age_ms = (Utc::now() - entry.created_at).num_milliseconds(),
            "request cancelled"
        );
        true
    }

    /// Abort and remove every entry present when the call starts.
    ///
    /// Every entry is attempted even if some aborts fail.
    pub fn cancel_all(&self) -> CancelSummary {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut summary = CancelSummary::default();

        for id in ids {
            // A concurrent cancel/remove may have taken it already.
            let Some((_, entry)) = self.entries.remove(&id) else {
                continue;
            };
            summary.cancelled += 1;
            if let Err(e) = entry.handle.abort() {
                summary.failed += 1;
                tracing::warn!(request_id = %id, error = %e, "abort failed during cancel_all");
            }
        }

        tracing::info!(
            cancelled = summary.cancelled,
            failed = summary.failed,
            "cancelled all active requests"
        );
        summary
    }

    /// Remove the entry for `id` without aborting it.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Shutdown hook: abort everything still in flight.
    pub fn drain(&self) -> CancelSummary {
        self.cancel_all()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
