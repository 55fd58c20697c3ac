//! Durable tier.
//!
//! Entries survive a restart and are scoped to an origin: every origin gets its own
//! directory under the configured root holding a single bincode snapshot. The full
//! snapshot is rewritten (tmp file + rename) after each change. A byte quota bounds
//! one origin's entries; a write that would exceed it fails with
//! `StorageError::QuotaExceeded` and leaves the tier untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::expired;
use crate::config::DurableSettings;
use crate::error::StorageError;

/// Per-entry bookkeeping bytes counted against the quota on top of key and payload.
const RECORD_OVERHEAD: u64 = 16;

/// One durable entry; `payload` is the JSON-encoded cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub payload: Vec<u8>,
    pub inserted_at_ms: i64,
    pub ttl_ms: u64,
}

impl DurableRecord {
    pub fn is_expired(&self, now_ms: i64) -> bool { expired(self.inserted_at_ms, self.ttl_ms, now_ms) }

    fn footprint(&self, key: &str) -> u64 { key.len() as u64 + self.payload.len() as u64 + RECORD_OVERHEAD }
}

/// Key plus timestamps, without the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    pub key: String,
    pub inserted_at_ms: i64,
    pub ttl_ms: u64,
}

impl Stamp {
    pub fn is_expired(&self, now_ms: i64) -> bool { expired(self.inserted_at_ms, self.ttl_ms, now_ms) }
}

/// Storage behind the durable tier.
pub trait DurableTier: Send + Sync {
    fn read(&self, key: &str) -> Option<DurableRecord>;
    fn write(&self, key: &str, record: DurableRecord) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> bool;
    /// Timestamps of every entry, oldest insertion first.
    fn stamps(&self) -> Vec<Stamp>;
    fn clear(&self);

    fn remove_many(&self, keys: &[String]) -> usize {
        keys.iter().filter(|k| self.remove(k)).count()
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    origin: String,
    entries: Vec<(String, DurableRecord)>,
}

const SNAPSHOT_VERSION: u32 = 1;

/// File-backed durable tier.
#[derive(Debug)]
pub struct SnapshotTier {
    dir: PathBuf,
    origin: String,
    quota_bytes: u64,
    entries: RwLock<HashMap<String, DurableRecord>>,
}

impl SnapshotTier {
    /// Open (or create) the tier for `settings.origin`, loading any previous snapshot.
    /// An unreadable snapshot is discarded rather than failing the open.
    pub fn open(settings: &DurableSettings) -> anyhow::Result<Self> {
        let dir = settings.root.join(sanitize_origin(&settings.origin));
        std::fs::create_dir_all(&dir).with_context(|| format!("creating cache dir {}", dir.display()))?;
        let tier = Self {
            dir,
            origin: settings.origin.clone(),
            quota_bytes: settings.quota_bytes,
            entries: RwLock::new(HashMap::new()),
        };
        if let Err(e) = tier.load_snapshot() {
            warn!(target: "querychart::cache", "discarding unreadable snapshot in {}: {:#}", tier.dir.display(), e);
        }
        Ok(tier)
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn used_bytes(&self) -> u64 { Self::footprint(&self.entries.read()) }

    pub fn len(&self) -> usize { self.entries.read().len() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }

    fn snapshot_path(&self) -> PathBuf { self.dir.join("snapshot.bin") }

    fn footprint(map: &HashMap<String, DurableRecord>) -> u64 { map.iter().map(|(k, r)| r.footprint(k)).sum() }

    fn load_snapshot(&self) -> anyhow::Result<()> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(());
        }
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let snap: Snapshot = bincode::deserialize(&bytes).context("decoding cache snapshot")?;
        if snap.version != SNAPSHOT_VERSION {
            anyhow::bail!("unsupported snapshot version {}", snap.version);
        }
        let mut w = self.entries.write();
        w.clear();
        w.extend(snap.entries);
        debug!(target: "querychart::cache", origin=%self.origin, entries=w.len(), "loaded durable snapshot");
        Ok(())
    }

    fn save_snapshot(&self, map: &HashMap<String, DurableRecord>) -> Result<(), StorageError> {
        let snap = Snapshot {
            version: SNAPSHOT_VERSION,
            origin: self.origin.clone(),
            entries: map.iter().map(|(k, r)| (k.clone(), r.clone())).collect(),
        };
        let bytes = bincode::serialize(&snap)?;
        let tmp = self.snapshot_path().with_extension("bin.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(tmp, self.snapshot_path())?;
        Ok(())
    }

    fn persist_or_warn(&self, map: &HashMap<String, DurableRecord>) {
        if let Err(e) = self.save_snapshot(map) {
            warn!(target: "querychart::cache", origin=%self.origin, "durable snapshot not saved: {}", e);
        }
    }
}

impl DurableTier for SnapshotTier {
    fn read(&self, key: &str) -> Option<DurableRecord> { self.entries.read().get(key).cloned() }

    fn write(&self, key: &str, record: DurableRecord) -> Result<(), StorageError> {
        let mut w = self.entries.write();
        let replaced = w.get(key).map(|r| r.footprint(key)).unwrap_or(0);
        let needed = Self::footprint(&w) - replaced + record.footprint(key);
        if needed > self.quota_bytes {
            return Err(StorageError::QuotaExceeded { needed, quota: self.quota_bytes });
        }
        let previous = w.insert(key.to_string(), record);
        if let Err(e) = self.save_snapshot(&w) {
            match previous {
                Some(p) => w.insert(key.to_string(), p),
                None => w.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> bool {
        let mut w = self.entries.write();
        let removed = w.remove(key).is_some();
        if removed {
            self.persist_or_warn(&w);
        }
        removed
    }

    fn stamps(&self) -> Vec<Stamp> {
        let mut out: Vec<Stamp> = self
            .entries
            .read()
            .iter()
            .map(|(k, r)| Stamp { key: k.clone(), inserted_at_ms: r.inserted_at_ms, ttl_ms: r.ttl_ms })
            .collect();
        out.sort_by(|a, b| a.inserted_at_ms.cmp(&b.inserted_at_ms).then_with(|| a.key.cmp(&b.key)));
        out
    }

    fn clear(&self) {
        let mut w = self.entries.write();
        w.clear();
        self.persist_or_warn(&w);
    }

    fn remove_many(&self, keys: &[String]) -> usize {
        let mut w = self.entries.write();
        let removed = keys.iter().filter(|k| w.remove(k.as_str()).is_some()).count();
        if removed > 0 {
            self.persist_or_warn(&w);
        }
        removed
    }
}

fn sanitize_origin(origin: &str) -> String {
    let s: String = origin.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' }).collect();
    if s.is_empty() { "default".to_string() } else { s }
}
