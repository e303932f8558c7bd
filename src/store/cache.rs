//! Bounded-staleness snapshot cache
//!
//! The cache is a plain value object; `refresh` is a pure function of the
//! previous cache, a fallible fetch, and the current time, which keeps the
//! TTL and fallback policy testable without mocking a clock.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::error::StoreResult;

use super::{CachedSnapshot, SheetStore, Snapshot};

/// Decide whether `cache` can still be trusted at `now`.
pub fn is_fresh(cache: &CachedSnapshot, ttl: Duration, now: DateTime<Utc>) -> bool {
    cache.valid && now - cache.captured_at < ttl
}

/// Return a snapshot no staler than `ttl`, re-fetching when needed.
///
/// A fetch failure falls back to the last-known-good snapshot when one
/// exists; only a failure with no prior capture yields an
/// empty-but-invalid snapshot, which downstream treats as "no known
/// entities" rather than an error.
pub fn refresh(
    previous: Option<CachedSnapshot>,
    fetch: impl FnOnce() -> StoreResult<Snapshot>,
    ttl: Duration,
    now: DateTime<Utc>,
) -> CachedSnapshot {
    let previous = match previous {
        Some(cache) if is_fresh(&cache, ttl, now) => return cache,
        other => other,
    };

    match fetch() {
        Ok(snapshot) => CachedSnapshot {
            captured_at: now,
            snapshot,
            valid: true,
        },
        Err(err) => match previous {
            Some(stale) if stale.valid => {
                warn!(error = %err, "snapshot refresh failed, reusing stale snapshot");
                stale
            }
            _ => {
                warn!(error = %err, "snapshot refresh failed with no prior capture");
                CachedSnapshot {
                    captured_at: now,
                    snapshot: Snapshot::default(),
                    valid: false,
                }
            }
        },
    }
}

/// Owns the cached snapshot lifecycle for a store.
pub struct SnapshotCache<'a, S: SheetStore + ?Sized> {
    store: &'a S,
    ttl: Duration,
    current: Option<CachedSnapshot>,
}

impl<'a, S: SheetStore + ?Sized> SnapshotCache<'a, S> {
    pub fn new(store: &'a S, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            current: None,
        }
    }

    /// Get a trusted snapshot, refreshing from the store when stale.
    pub fn read(&mut self, now: DateTime<Utc>) -> &CachedSnapshot {
        let previous = self.current.take();
        let cache = refresh(previous, || self.store.read_snapshot(), self.ttl, now);
        self.current.insert(cache)
    }

    /// Drop the current capture so the next read re-fetches, e.g. after a
    /// flush made the snapshot stale by construction.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}
