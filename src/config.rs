//! Cache and query-executor settings.
//!
//! Settings come from three places, later ones winning: built-in defaults, an optional
//! JSON settings file (`load_or_default`) and `QUERYCHART_*` environment variables
//! (`from_env`). A missing or unreadable settings file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CacheSettings {
    /// Maximum number of entries held by the in-process tier.
    #[serde(default = "CacheSettings::default_memory_capacity")]
    pub memory_capacity: usize,
    /// TTL applied when the caller does not supply one.
    #[serde(default = "CacheSettings::default_ttl_ms")]
    pub default_ttl_ms: u64,
    /// Durable tier; absent means in-process caching only.
    #[serde(default)]
    pub durable: Option<DurableSettings>,
}

impl CacheSettings {
    fn default_memory_capacity() -> usize { 100 }
    fn default_ttl_ms() -> u64 { 5 * 60_000 }

    pub fn default_ttl(&self) -> Duration { Duration::from_millis(self.default_ttl_ms) }

    /// Read settings from a JSON file, falling back to defaults when absent or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<CacheSettings>(&bytes) {
                Ok(s) => s,
                Err(e) => {
                    debug!(target: "querychart::cache", "settings '{}' unreadable ({}); using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Apply `QUERYCHART_CACHE_*` overrides on top of `self`.
    pub fn with_env(mut self) -> Self {
        if let Some(n) = env_parse::<usize>("QUERYCHART_CACHE_CAPACITY") { self.memory_capacity = n; }
        if let Some(ms) = env_parse::<u64>("QUERYCHART_CACHE_TTL_MS") { self.default_ttl_ms = ms; }
        if let Ok(dir) = std::env::var("QUERYCHART_CACHE_DIR") {
            let mut durable = self.durable.take().unwrap_or_default();
            durable.root = PathBuf::from(dir);
            self.durable = Some(durable);
        }
        if let Some(d) = self.durable.as_mut() {
            if let Ok(origin) = std::env::var("QUERYCHART_CACHE_ORIGIN") { d.origin = origin; }
            if let Some(q) = env_parse::<u64>("QUERYCHART_CACHE_QUOTA_BYTES") { d.quota_bytes = q; }
        }
        self
    }

    pub fn from_env() -> Self { Self::default().with_env() }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { memory_capacity: Self::default_memory_capacity(), default_ttl_ms: Self::default_ttl_ms(), durable: None }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DurableSettings {
    /// Directory holding one sub-directory per origin.
    #[serde(default = "DurableSettings::default_root")]
    pub root: PathBuf,
    /// Origin the durable entries are scoped to (e.g. the dashboard's base URL).
    #[serde(default = "DurableSettings::default_origin")]
    pub origin: String,
    /// Byte budget for one origin's entries; writes beyond it fail with a quota error.
    #[serde(default = "DurableSettings::default_quota_bytes")]
    pub quota_bytes: u64,
}

impl DurableSettings {
    fn default_root() -> PathBuf { PathBuf::from(".querychart") }
    fn default_origin() -> String { "default".to_string() }
    fn default_quota_bytes() -> u64 { 5 * 1024 * 1024 }
}

impl Default for DurableSettings {
    fn default() -> Self {
        Self { root: Self::default_root(), origin: Self::default_origin(), quota_bytes: Self::default_quota_bytes() }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ExecutorSettings {
    /// Base URL of the query-execution service.
    pub base_url: String,
    #[serde(default = "ExecutorSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ExecutorSettings {
    fn default_timeout_ms() -> u64 { 30_000 }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    pub fn from_env() -> Self {
        let base_url = std::env::var("QUERYCHART_QUERY_URL").unwrap_or_else(|_| "http://127.0.0.1:7878".to_string());
        let timeout_ms = env_parse::<u64>("QUERYCHART_QUERY_TIMEOUT_MS").unwrap_or_else(Self::default_timeout_ms);
        Self { base_url, timeout_ms }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};

    static ENV_LOCK: Mutex<()> = const_mutex(());

    /// Run `f` with `vars` set, removing them afterwards. Callers hold `ENV_LOCK`.
    fn with_vars<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        let out = f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
        out
    }

    #[test]
    fn env_overrides_cache_settings() {
        let _guard = ENV_LOCK.lock();
        let s = with_vars(&[("QUERYCHART_CACHE_CAPACITY", "12"), ("QUERYCHART_CACHE_TTL_MS", " 1500 ")], CacheSettings::from_env);
        assert_eq!(s.memory_capacity, 12);
        assert_eq!(s.default_ttl(), Duration::from_millis(1500));
        assert!(s.durable.is_none());
    }

    #[test]
    fn cache_dir_env_creates_durable_section() {
        let _guard = ENV_LOCK.lock();
        let s = with_vars(
            &[
                ("QUERYCHART_CACHE_DIR", "/var/cache/qc"),
                ("QUERYCHART_CACHE_ORIGIN", "https://dash.local"),
                ("QUERYCHART_CACHE_QUOTA_BYTES", "4096"),
            ],
            CacheSettings::from_env,
        );
        let d = s.durable.unwrap();
        assert_eq!(d.root, PathBuf::from("/var/cache/qc"));
        assert_eq!(d.origin, "https://dash.local");
        assert_eq!(d.quota_bytes, 4096);
    }

    #[test]
    fn origin_env_without_durable_section_is_ignored() {
        let _guard = ENV_LOCK.lock();
        let s = with_vars(&[("QUERYCHART_CACHE_ORIGIN", "https://dash.local")], CacheSettings::from_env);
        assert_eq!(s, CacheSettings::default());
    }

    #[test]
    fn env_applies_on_top_of_file_settings() {
        let _guard = ENV_LOCK.lock();
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("cache.json");
        std::fs::write(&p, r#"{"memory_capacity": 7, "durable": {"origin": "https://file.local", "quota_bytes": 10}}"#).unwrap();
        let s = with_vars(&[("QUERYCHART_CACHE_QUOTA_BYTES", "20"), ("QUERYCHART_CACHE_CAPACITY", "oops")], || {
            CacheSettings::load_or_default(&p).with_env()
        });
        assert_eq!(s.memory_capacity, 7);
        let d = s.durable.unwrap();
        assert_eq!((d.origin.as_str(), d.quota_bytes), ("https://file.local", 20));
    }

    #[test]
    fn executor_settings_from_env() {
        let _guard = ENV_LOCK.lock();
        let s = with_vars(&[], ExecutorSettings::from_env);
        assert_eq!(s, ExecutorSettings { base_url: "http://127.0.0.1:7878".into(), timeout_ms: 30_000 });

        let s = with_vars(
            &[("QUERYCHART_QUERY_URL", "https://api.example/v1"), ("QUERYCHART_QUERY_TIMEOUT_MS", "250")],
            ExecutorSettings::from_env,
        );
        assert_eq!(s.base_url, "https://api.example/v1");
        assert_eq!(s.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn defaults_when_file_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let s = CacheSettings::load_or_default(&tmp.path().join("nope.json"));
        assert_eq!(s, CacheSettings::default());
        assert_eq!(s.default_ttl(), Duration::from_secs(300));
        assert_eq!(s.memory_capacity, 100);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("cache.json");
        std::fs::write(&p, r#"{"memory_capacity": 7, "durable": {"origin": "https://dash.local"}}"#).unwrap();
        let s = CacheSettings::load_or_default(&p);
        assert_eq!(s.memory_capacity, 7);
        assert_eq!(s.default_ttl_ms, 300_000);
        let d = s.durable.unwrap();
        assert_eq!(d.origin, "https://dash.local");
        assert_eq!(d.quota_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn invalid_file_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("cache.json");
        std::fs::write(&p, b"{not json").unwrap();
        assert_eq!(CacheSettings::load_or_default(&p), CacheSettings::default());
    }
}
