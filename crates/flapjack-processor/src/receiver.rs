use crate::event::{normalize, MalformedEvent};
use flapjack_store::{events, Store, StoreError};
use std::sync::atomic::{AtomicU64, Ordering};

/// The Event Receiver (spec.md §4.A): the only component that touches
/// events before they're durably queued. Holds no per-check state — just a
/// running count of rejected payloads, exposed for monitoring.
pub struct EventReceiver {
    store: Store,
    rejected: AtomicU64,
    accepted: AtomicU64,
}

impl EventReceiver {
    pub fn new(store: Store) -> Self {
        EventReceiver {
            store,
            rejected: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Validates and durably enqueues one event. Malformed payloads are
    /// rejected without reaching the store; they only bump the reject
    /// counter so the receiver can stay oblivious to any particular check's
    /// history.
    #[tracing::instrument(skip(self, payload))]
    pub async fn accept(&self, payload: serde_json::Value) -> Result<i64, AcceptError> {
        if let Err(err) = normalize(&payload) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(AcceptError::Malformed(err));
        }

        let id = events::append(self.store.pool(), &payload).await?;
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error(transparent)]
    Malformed(#[from] MalformedEvent),
    #[error(transparent)]
    Store(#[from] StoreError),
}
