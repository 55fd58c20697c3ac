//! In-process tier: bounded map with insertion-order eviction.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::CacheEntry;

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<String, CacheEntry>,
    /// Keys oldest-first by (re)insertion.
    order: VecDeque<String>,
}

#[derive(Debug)]
pub(crate) struct HotTier {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl HotTier {
    pub(crate) fn new(capacity: usize) -> Self { Self { capacity, inner: Mutex::new(Inner::default()) } }

    pub(crate) fn get(&self, key: &str) -> Option<CacheEntry> { self.inner.lock().map.get(key).cloned() }

    /// Insert or replace; returns the keys evicted to get back under capacity.
    pub(crate) fn insert(&self, key: String, entry: CacheEntry) -> Vec<String> {
        let mut g = self.inner.lock();
        if g.map.insert(key.clone(), entry).is_some() {
            g.order.retain(|k| *k != key);
        }
        g.order.push_back(key);
        let mut evicted = Vec::new();
        while g.map.len() > self.capacity {
            let Some(oldest) = g.order.pop_front() else { break };
            g.map.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        let mut g = self.inner.lock();
        if g.map.remove(key).is_some() {
            g.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    pub(crate) fn clear(&self) {
        let mut g = self.inner.lock();
        g.map.clear();
        g.order.clear();
    }

    /// Drop entries expired at `now_ms`; returns how many were removed.
    pub(crate) fn sweep(&self, now_ms: i64) -> usize {
        let mut g = self.inner.lock();
        let before = g.map.len();
        g.map.retain(|_, e| !e.is_expired(now_ms));
        let Inner { map, order } = &mut *g;
        order.retain(|k| map.contains_key(k));
        before - map.len()
    }

    pub(crate) fn len(&self) -> usize { self.inner.lock().map.len() }
}
