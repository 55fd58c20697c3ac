//!
//! querychart result cache
//! -----------------------
//! Two-tier memoization of shaped chart payloads, keyed by (result owner, connection,
//! normalized query text, optional date range).
//!
//! - hot tier: in-process, bounded, evicts the oldest insertion once over capacity.
//! - durable tier: origin-scoped, survives restarts, bounded by a byte quota. On a
//!   quota failure the oldest half of its entries is evicted and the write retried
//!   once; a second failure drops the write.
//!
//! Lookups check the hot tier, then the durable tier (promoting hits). Expired
//! entries are removed when seen. The cache is best-effort: no operation here
//! returns an error, and an always-empty cache (`NoopCache`) is a valid stand-in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod clock;
pub mod durable;
mod hot;
pub mod key;

pub use clock::{Clock, ManualClock, SystemClock};
pub use durable::{DurableRecord, DurableTier, SnapshotTier, Stamp};
pub use key::{normalize_query, CacheKey, DateRange};

use crate::config::CacheSettings;
use crate::error::{AppError, AppResult};
use crate::service::ChartPayload;
use hot::HotTier;

/// `true` once `now_ms` reaches `inserted_at_ms + ttl_ms`.
pub(crate) fn expired(inserted_at_ms: i64, ttl_ms: u64, now_ms: i64) -> bool {
    now_ms >= inserted_at_ms.saturating_add(ttl_ms.min(i64::MAX as u64) as i64)
}

/// A cached payload with the timestamps needed to revalidate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub payload: ChartPayload,
    pub inserted_at_ms: i64,
    pub ttl_ms: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: i64) -> bool { expired(self.inserted_at_ms, self.ttl_ms, now_ms) }
}

/// Counters since construction (or the last `clear`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hot_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
    /// Entries removed for space: hot-tier capacity or durable-tier quota.
    pub evictions: u64,
    /// Durable writes given up on.
    pub dropped_writes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hot_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    dropped_writes: AtomicU64,
}

impl Counters {
    fn bump(c: &AtomicU64, n: u64) { c.fetch_add(n, Ordering::Relaxed); }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hot_hits: self.hot_hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            dropped_writes: self.dropped_writes.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for c in [&self.hot_hits, &self.durable_hits, &self.misses, &self.evictions, &self.dropped_writes] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// Lookup/store seam used by the chart service.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<ChartPayload>;
    /// Store `payload`; `None` uses the cache's own default TTL.
    fn set(&self, key: &CacheKey, payload: &ChartPayload, ttl: Option<Duration>);
    fn invalidate(&self, key: &CacheKey);
}

/// Cache that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<ChartPayload> { None }
    fn set(&self, _key: &CacheKey, _payload: &ChartPayload, _ttl: Option<Duration>) {}
    fn invalidate(&self, _key: &CacheKey) {}
}

pub struct QueryCache {
    hot: HotTier,
    durable: Option<Box<dyn DurableTier>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    counters: Counters,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("hot_len", &self.hot.len())
            .field("durable", &self.durable.is_some())
            .field("clock", &self.clock)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl QueryCache {
    /// Build from settings, opening the durable tier when one is configured. A durable
    /// directory that cannot be created is an `AppError::Io`.
    pub fn new(settings: &CacheSettings) -> AppResult<Self> {
        let mut cache = Self::in_memory(settings.memory_capacity).with_default_ttl(settings.default_ttl());
        if let Some(d) = &settings.durable {
            let tier = SnapshotTier::open(d).map_err(|e| AppError::io("cache_unavailable".to_string(), format!("{:#}", e)))?;
            cache = cache.with_durable(Box::new(tier));
        }
        Ok(cache)
    }

    /// Hot tier only.
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            hot: HotTier::new(capacity),
            durable: None,
            clock: Arc::new(SystemClock),
            default_ttl: CacheSettings::default().default_ttl(),
            counters: Counters::default(),
        }
    }

    pub fn with_durable(mut self, tier: Box<dyn DurableTier>) -> Self {
        self.durable = Some(tier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration { self.default_ttl }

    pub fn stats(&self) -> CacheStats { self.counters.snapshot() }

    pub fn get(&self, key: &CacheKey) -> Option<ChartPayload> {
        let now = self.clock.now_ms();
        let sk = key.storage_key();

        if let Some(entry) = self.hot.get(&sk) {
            if !entry.is_expired(now) {
                Counters::bump(&self.counters.hot_hits, 1);
                return Some(entry.payload);
            }
            self.hot.remove(&sk);
            debug!(target: "querychart::cache", key=%sk, "hot entry expired");
        }

        if let Some(durable) = &self.durable {
            if let Some(record) = durable.read(&sk) {
                if record.is_expired(now) {
                    durable.remove(&sk);
                    debug!(target: "querychart::cache", key=%sk, "durable entry expired");
                } else {
                    match serde_json::from_slice::<ChartPayload>(&record.payload) {
                        Ok(payload) => {
                            let entry = CacheEntry { payload: payload.clone(), inserted_at_ms: record.inserted_at_ms, ttl_ms: record.ttl_ms };
                            self.insert_hot(sk, entry);
                            Counters::bump(&self.counters.durable_hits, 1);
                            return Some(payload);
                        }
                        Err(e) => {
                            warn!(target: "querychart::cache", key=%sk, "dropping undecodable durable entry: {}", e);
                            durable.remove(&sk);
                        }
                    }
                }
            }
        }

        Counters::bump(&self.counters.misses, 1);
        None
    }

    /// Store `payload` in both tiers. `ttl` of `None` uses the default TTL.
    pub fn set(&self, key: &CacheKey, payload: &ChartPayload, ttl: Option<Duration>) {
        let now = self.clock.now_ms();
        let ttl_ms = ttl.unwrap_or(self.default_ttl).as_millis().min(u64::MAX as u128) as u64;
        let sk = key.storage_key();
        self.insert_hot(sk.clone(), CacheEntry { payload: payload.clone(), inserted_at_ms: now, ttl_ms });

        let Some(durable) = &self.durable else { return };
        let bytes = match serde_json::to_vec(payload) {
            Ok(b) => b,
            Err(e) => {
                warn!(target: "querychart::cache", key=%sk, "payload not encodable for durable tier: {}", e);
                Counters::bump(&self.counters.dropped_writes, 1);
                return;
            }
        };
        Self::sweep_durable(&**durable, now);

        let record = DurableRecord { payload: bytes, inserted_at_ms: now, ttl_ms };
        match durable.write(&sk, record.clone()) {
            Ok(()) => {}
            Err(e) if e.is_quota() => {
                let evicted = Self::evict_oldest_half(&**durable);
                Counters::bump(&self.counters.evictions, evicted as u64);
                debug!(target: "querychart::cache", evicted, "durable quota hit ({}); retrying once", e);
                if let Err(e) = durable.write(&sk, record) {
                    warn!(target: "querychart::cache", key=%sk, "durable write dropped: {}", e);
                    Counters::bump(&self.counters.dropped_writes, 1);
                }
            }
            Err(e) => {
                warn!(target: "querychart::cache", key=%sk, "durable write dropped: {}", e);
                Counters::bump(&self.counters.dropped_writes, 1);
            }
        }
    }

    /// Remove `key` from both tiers. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let sk = key.storage_key();
        let hot = self.hot.remove(&sk);
        let durable = self.durable.as_ref().map(|d| d.remove(&sk)).unwrap_or(false);
        debug!(target: "querychart::cache", key=%sk, hot, durable, "invalidated");
        hot || durable
    }

    /// Empty both tiers and reset the counters.
    pub fn clear(&self) {
        self.hot.clear();
        if let Some(d) = &self.durable {
            d.clear();
        }
        self.counters.reset();
    }

    /// Remove expired entries from both tiers; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let hot = self.hot.sweep(now);
        let durable = self.durable.as_ref().map(|d| Self::sweep_durable(&**d, now)).unwrap_or(0);
        hot + durable
    }

    fn insert_hot(&self, key: String, entry: CacheEntry) {
        let evicted = self.hot.insert(key, entry);
        if !evicted.is_empty() {
            debug!(target: "querychart::cache", evicted=?evicted, "hot tier over capacity");
            Counters::bump(&self.counters.evictions, evicted.len() as u64);
        }
    }

    fn sweep_durable(durable: &dyn DurableTier, now_ms: i64) -> usize {
        let stale: Vec<String> = durable.stamps().into_iter().filter(|s| s.is_expired(now_ms)).map(|s| s.key).collect();
        if stale.is_empty() {
            return 0;
        }
        let removed = durable.remove_many(&stale);
        debug!(target: "querychart::cache", removed, "swept expired durable entries");
        removed
    }

    /// Evict the older half (rounded up) of durable entries by insertion time.
    fn evict_oldest_half(durable: &dyn DurableTier) -> usize {
        let stamps = durable.stamps();
        let half = (stamps.len() + 1) / 2;
        let victims: Vec<String> = stamps.into_iter().take(half).map(|s| s.key).collect();
        durable.remove_many(&victims)
    }
}

impl ResultCache for QueryCache {
    fn get(&self, key: &CacheKey) -> Option<ChartPayload> { QueryCache::get(self, key) }

    fn set(&self, key: &CacheKey, payload: &ChartPayload, ttl: Option<Duration>) { QueryCache::set(self, key, payload, ttl) }

    fn invalidate(&self, key: &CacheKey) { QueryCache::invalidate(self, key); }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
