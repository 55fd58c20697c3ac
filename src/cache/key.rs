//! Cache key derivation.
//!
//! A key is a pure function of (result owner, connection, normalized query text,
//! optional date range). Query text is NFC-normalized, runs of whitespace collapse to a
//! single space and the ends are trimmed, so cosmetic formatting differences share an
//! entry.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use xxhash_rust::xxh3::xxh3_128;

/// Prefix of every storage key; lets a shared durable store tell cache entries apart.
pub const KEY_PREFIX: &str = "qc";

/// Optional inclusive date window the query was run with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, rename = "fromDate", skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, rename = "toDate", skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self { Self { from, to } }

    pub fn is_unbounded(&self) -> bool { self.from.is_none() && self.to.is_none() }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    owner: String,
    connection: String,
    query: String,
    range: DateRange,
}

impl CacheKey {
    /// `owner` identifies whoever the result belongs to (a chart or a chat message).
    pub fn new(owner: impl Into<String>, connection: impl Into<String>, query: &str) -> Self {
        Self { owner: owner.into(), connection: connection.into(), query: normalize_query(query), range: DateRange::default() }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn owner(&self) -> &str { &self.owner }
    pub fn connection(&self) -> &str { &self.connection }
    pub fn normalized_query(&self) -> &str { &self.query }
    pub fn range(&self) -> DateRange { self.range }

    /// Flat string form used by both tiers:
    /// `qc:<owner b64>:<connection b64>:<query xxh3-128 hex>:<from>:<to>`.
    pub fn storage_key(&self) -> String {
        let day = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        format!(
            "{}:{}:{}:{:032x}:{}:{}",
            KEY_PREFIX,
            URL_SAFE_NO_PAD.encode(self.owner.as_bytes()),
            URL_SAFE_NO_PAD.encode(self.connection.as_bytes()),
            xxh3_128(self.query.as_bytes()),
            day(self.range.from),
            day(self.range.to),
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.storage_key()) }
}

/// NFC, collapse whitespace runs to one space, trim.
pub fn normalize_query(query: &str) -> String {
    let nfc: String = query.nfc().collect();
    nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}
