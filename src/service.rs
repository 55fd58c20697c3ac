//! Chart loading: cache lookup, query execution on a miss, shaping, cache store.
//!
//! Nothing is written to the cache until the executor has answered successfully, so a
//! failed or dropped (cancelled) `load` leaves the cache exactly as it was.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheKey, DateRange, NoopCache, ResultCache};
use crate::error::{AppError, AppResult};
use crate::executor::QueryExecutor;
use crate::shape::{shape_with_hints, ChartDataConfig, ChartKind, ShapeHints};

/// What a chart needs to render, plus the execution metadata shown alongside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPayload {
    pub config: ChartDataConfig,
    pub row_count: u64,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    /// Owner of the cached result (a chart, or a chat message with an inline chart).
    pub chart_id: String,
    pub connection_id: String,
    pub query: String,
    pub kind: ChartKind,
    #[serde(default)]
    pub range: DateRange,
    #[serde(default)]
    pub hints: ShapeHints,
}

impl ChartRequest {
    pub fn new(chart_id: impl Into<String>, connection_id: impl Into<String>, query: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            chart_id: chart_id.into(),
            connection_id: connection_id.into(),
            query: query.into(),
            kind,
            range: DateRange::default(),
            hints: ShapeHints::default(),
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_hints(mut self, hints: ShapeHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.chart_id.as_str(), self.connection_id.as_str(), &self.query).with_range(self.range)
    }

    fn validate(&self) -> AppResult<()> {
        if self.connection_id.trim().is_empty() {
            return Err(AppError::user("missing_connection", "no connection selected"));
        }
        if self.query.trim().is_empty() {
            return Err(AppError::user("empty_query", "query text is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Serve from cache when possible.
    #[default]
    Cached,
    /// Drop any cached entry and re-run the query.
    Bypass,
}

pub struct ChartService<E> {
    executor: E,
    cache: Arc<dyn ResultCache>,
    /// `None` defers to the cache's configured TTL.
    ttl: Option<Duration>,
}

impl<E: QueryExecutor> ChartService<E> {
    pub fn new(executor: E, cache: Arc<dyn ResultCache>) -> Self { Self { executor, cache, ttl: None } }

    /// Service whose cache never holds anything.
    pub fn uncached(executor: E) -> Self { Self::new(executor, Arc::new(NoopCache)) }

    /// Override the cache's TTL for entries this service stores.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn executor(&self) -> &E { &self.executor }

    pub fn cache(&self) -> &Arc<dyn ResultCache> { &self.cache }

    /// Load and shape a chart. Executor failures are returned unchanged.
    pub async fn load(&self, request: &ChartRequest, mode: FetchMode) -> AppResult<ChartPayload> {
        request.validate()?;
        let key = request.cache_key();
        match mode {
            FetchMode::Cached => {
                if let Some(hit) = self.cache.get(&key) {
                    debug!(target: "querychart::cache", chart=%request.chart_id, "served from cache");
                    return Ok(hit);
                }
            }
            FetchMode::Bypass => self.cache.invalidate(&key),
        }

        let started = Instant::now();
        let response = match self.executor.execute(&request.connection_id, &request.query, request.range).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "querychart::exec", chart=%request.chart_id, "query failed: {}", e);
                return Err(e);
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let config = shape_with_hints(&response.rows, request.kind, &request.hints);
        let payload = ChartPayload {
            row_count: response.row_count.unwrap_or(response.rows.len() as u64),
            execution_time_ms: response.execution_time_ms.unwrap_or(elapsed_ms),
            cached_at: response.cached_at,
            config,
        };
        self.cache.set(&key, &payload, self.ttl);
        debug!(target: "querychart::exec", chart=%request.chart_id, rows=payload.row_count, "chart loaded");
        Ok(payload)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
