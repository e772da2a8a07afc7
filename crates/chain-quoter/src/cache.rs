//! Single-slot cache for the current gas price snapshot.

use crate::types::GasPriceSnapshot;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Holds at most one gas price snapshot.
///
/// Writers replace the whole `Arc` under the lock, so readers always see a
/// complete snapshot. Overlapping writers resolve as last-write-wins.
#[derive(Debug, Default)]
pub struct GasPriceCache {
    slot: RwLock<Option<Arc<GasPriceSnapshot>>>,
}

impl GasPriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored snapshot, fresh or not. Never blocks on I/O.
    pub fn get(&self) -> Option<Arc<GasPriceSnapshot>> {
        // A poisoned lock still guards a whole snapshot; the writer only swaps the Arc.
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the stored snapshot, returning the handle now being served.
    pub fn set(&self, snapshot: GasPriceSnapshot) -> Arc<GasPriceSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        snapshot
    }

    /// True iff a snapshot exists and `now - captured_at < ttl`.
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(snapshot) => is_fresh(snapshot, now, ttl),
            None => false,
        }
    }
}

pub(crate) fn is_fresh(snapshot: &GasPriceSnapshot, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age = now.signed_duration_since(snapshot.captured_at);
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => age < ttl,
        // A TTL beyond chrono's range never expires.
        Err(_) => true,
    }
}
