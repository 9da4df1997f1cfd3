//! Time-bounded snapshot cache, one entry per region key.
//!
//! Refreshes are single-flight: a request that finds its entry expired takes
//! the key's refresh lock, and requests arriving meanwhile wait on that lock
//! and then reuse whatever the holder stored. Readers of a fresh entry never
//! touch the refresh lock.
use crate::clients::SnapshotSource;
use crate::domain::{Region, RegionKey, Snapshot};
use crate::errors::FetchError;
use crate::services::normalize::normalize_snapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why the last refresh attempt produced nothing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub code: &'static str,
    pub message: String,
}

impl From<&FetchError> for FetchFailure {
    fn from(err: &FetchError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CacheLookup {
    Fresh(Arc<Snapshot>),
    /// Refresh failed, the previous snapshot is returned as is
    Stale {
        snapshot: Arc<Snapshot>,
        age: Duration,
        failure: FetchFailure,
    },
    /// Refresh failed and nothing was cached yet
    Unavailable(FetchFailure),
}

impl CacheLookup {
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            CacheLookup::Fresh(snapshot) | CacheLookup::Stale { snapshot, .. } => Some(snapshot),
            CacheLookup::Unavailable(_) => None,
        }
    }
}

/// Slots idle for longer than this are dropped when a new region key arrives
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

struct CacheEntry {
    snapshot: Arc<Snapshot>,
    inserted_at: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct SlotState {
    entry: Option<CacheEntry>,
    /// Successful stores so far
    stores: u64,
    /// Invalidations so far
    epoch: u64,
}

#[derive(Default)]
struct Slot {
    state: RwLock<SlotState>,
    refresh: Mutex<()>,
}

impl Slot {
    fn read(&self) -> RwLockReadGuard<'_, SlotState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh(&self, ttl: Duration) -> Option<Arc<Snapshot>> {
        self.read()
            .entry
            .as_ref()
            .filter(|e| !e.invalidated && e.inserted_at.elapsed() <= ttl)
            .map(|e| e.snapshot.clone())
    }

    fn current(&self) -> Option<(Arc<Snapshot>, Duration)> {
        self.read()
            .entry
            .as_ref()
            .map(|e| (e.snapshot.clone(), e.inserted_at.elapsed()))
    }

    fn stores(&self) -> u64 {
        self.read().stores
    }

    fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Store a snapshot fetched while the slot was at invalidation `epoch`,
    /// unless the cached one carries a later provider time. The entry stays
    /// invalidated if an invalidation arrived during the fetch.
    fn store(&self, snapshot: Snapshot, epoch: u64) -> Arc<Snapshot> {
        let mut state = self.write();
        let kept = match state.entry.take() {
            Some(prev) if prev.snapshot.time > snapshot.time => {
                debug!(
                    "Ignoring out-of-order snapshot (time {} < cached {})",
                    snapshot.time, prev.snapshot.time
                );
                prev.snapshot
            }
            _ => Arc::new(snapshot),
        };
        state.entry = Some(CacheEntry {
            snapshot: kept.clone(),
            inserted_at: Instant::now(),
            invalidated: state.epoch != epoch,
        });
        state.stores += 1;
        kept
    }

    fn invalidate(&self) {
        let mut state = self.write();
        state.epoch += 1;
        if let Some(e) = state.entry.as_mut() {
            e.invalidated = true;
        }
    }

    fn idle_for(&self, retention: Duration) -> bool {
        self.read()
            .entry
            .as_ref()
            .map_or(true, |e| e.inserted_at.elapsed() > retention)
    }
}

pub struct SnapshotCache {
    source: Arc<dyn SnapshotSource>,
    fetch_timeout: Duration,
    retention: Duration,
    slots: RwLock<HashMap<RegionKey, Arc<Slot>>>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn SnapshotSource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            fetch_timeout,
            retention: DEFAULT_RETENTION,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    fn slot(&self, key: &RegionKey) -> Arc<Slot> {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return slot.clone();
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if !slots.contains_key(key) {
            self.evict_idle(&mut slots);
        }
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop slots nobody is using whose entry is older than the retention.
    /// A slot held by a lookup (in flight or waiting) has more than one owner.
    fn evict_idle(&self, slots: &mut HashMap<RegionKey, Arc<Slot>>) {
        let before = slots.len();
        slots.retain(|_, slot| Arc::strong_count(slot) > 1 || !slot.idle_for(self.retention));
        let evicted = before - slots.len();
        if evicted > 0 {
            debug!("Evicted {} idle cache slots", evicted);
        }
    }

    /// Cached snapshot for `region` if it is at most `ttl` old, otherwise
    /// fetch, normalize and store a new one
    pub async fn get_or_fetch(&self, region: &Region, ttl: Duration) -> CacheLookup {
        let key = region.key();
        let slot = self.slot(&key);

        let seen = slot.stores();
        if let Some(snapshot) = slot.fresh(ttl) {
            debug!("Cache hit for region {}", key);
            return CacheLookup::Fresh(snapshot);
        }

        let _refresh = slot.refresh.lock().await;
        if slot.stores() != seen {
            if let Some((snapshot, _)) = slot.current() {
                debug!("Region {} refreshed by a concurrent request", key);
                return CacheLookup::Fresh(snapshot);
            }
        }

        let epoch = slot.epoch();
        match self.fetch(region).await {
            Ok(snapshot) => {
                let snapshot = slot.store(snapshot, epoch);
                if snapshot.is_empty() {
                    info!("No aircraft in region {} (provider time {})", key, snapshot.time);
                } else {
                    info!(
                        "Cached {} aircraft for region {} (provider time {})",
                        snapshot.records.len(),
                        key,
                        snapshot.time
                    );
                }
                CacheLookup::Fresh(snapshot)
            }
            Err(err) => {
                let failure = FetchFailure::from(&err);
                match slot.current() {
                    Some((snapshot, age)) => {
                        warn!(
                            "Fetch for region {} failed, serving {}s old snapshot: {}",
                            key,
                            age.as_secs(),
                            err
                        );
                        CacheLookup::Stale {
                            snapshot,
                            age,
                            failure,
                        }
                    }
                    None => {
                        warn!("Fetch for region {} failed, no data cached: {}", key, err);
                        CacheLookup::Unavailable(failure)
                    }
                }
            }
        }
    }

    async fn fetch(&self, region: &Region) -> Result<Snapshot, FetchError> {
        let raw = tokio::time::timeout(self.fetch_timeout, self.source.fetch(region))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;
        Ok(normalize_snapshot(raw, *region))
    }

    /// Force the next lookup of `key` to refetch. The old snapshot stays
    /// available as a stale fallback.
    pub fn invalidate(&self, key: &RegionKey) {
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        if let Some(slot) = slot {
            slot.invalidate();
            info!("Invalidated cache entry for region {}", key);
        }
    }

    /// Invalidate every entry. Slots are kept so in-flight refreshes and
    /// provider time ordering survive.
    pub fn clear(&self) {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.values() {
            slot.invalidate();
        }
        info!("Snapshot cache cleared ({} regions)", slots.len());
    }
}
