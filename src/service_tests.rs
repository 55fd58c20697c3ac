use super::*;
use crate::cache::{ManualClock, QueryCache};
use crate::executor::QueryResponse;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct ScriptedExecutor {
    calls: AtomicUsize,
    rows: Vec<Value>,
    fail: Option<AppError>,
    delay: Option<Duration>,
}

impl ScriptedExecutor {
    fn rows(rows: Vec<Value>) -> Self { Self { rows, ..Default::default() } }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, _connection_id: &str, _query: &str, _range: DateRange) -> AppResult<QueryResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        match &self.fail {
            Some(e) => Err(e.clone()),
            None => Ok(QueryResponse { rows: self.rows.clone(), execution_time_ms: Some(7), ..Default::default() }),
        }
    }
}

fn revenue_rows() -> Vec<Value> {
    vec![json!({"month": "2024-02", "revenue": 20}), json!({"month": "2024-01", "revenue": 10})]
}

fn request(query: &str) -> ChartRequest { ChartRequest::new("chart-1", "conn-1", query, ChartKind::Line) }

#[tokio::test]
async fn second_load_is_served_from_cache() {
    let cache = Arc::new(QueryCache::in_memory(10));
    let svc = ChartService::new(ScriptedExecutor::rows(revenue_rows()), cache.clone());

    let first = svc.load(&request("SELECT month, revenue FROM t"), FetchMode::Cached).await.unwrap();
    assert_eq!(first.row_count, 2);
    assert_eq!(first.execution_time_ms, 7);
    assert_eq!(first.config.x_axis_key, "month");
    assert_eq!(first.config.data[0]["month"], json!("2024-01"));

    // whitespace differences share the entry
    let second = svc.load(&request("SELECT month,  revenue\nFROM t"), FetchMode::Cached).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(svc.executor().calls(), 1);
    assert_eq!(cache.stats().hot_hits, 1);
}

#[tokio::test]
async fn configured_cache_ttl_governs_stored_entries() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let settings = crate::config::CacheSettings { default_ttl_ms: 2_000, ..Default::default() };
    let cache = Arc::new(QueryCache::new(&settings).unwrap().with_clock(clock.clone()));
    let svc = ChartService::new(ScriptedExecutor::rows(revenue_rows()), cache.clone());
    let req = request("select month, revenue from t");

    svc.load(&req, FetchMode::Cached).await.unwrap();
    clock.advance(Duration::from_millis(1_999));
    assert!(cache.get(&req.cache_key()).is_some());
    clock.advance(Duration::from_millis(1));
    assert!(cache.get(&req.cache_key()).is_none());
}

#[tokio::test]
async fn service_ttl_overrides_cache_default() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let cache = Arc::new(QueryCache::in_memory(10).with_clock(clock.clone()));
    let svc = ChartService::new(ScriptedExecutor::rows(revenue_rows()), cache.clone()).with_ttl(Duration::from_secs(1));
    let req = request("select 1");

    svc.load(&req, FetchMode::Cached).await.unwrap();
    clock.advance(Duration::from_secs(1));
    assert!(cache.get(&req.cache_key()).is_none());
}

#[tokio::test]
async fn bypass_reexecutes_and_refreshes() {
    let cache = Arc::new(QueryCache::in_memory(10));
    let svc = ChartService::new(ScriptedExecutor::rows(revenue_rows()), cache.clone());
    let req = request("select 1");
    svc.load(&req, FetchMode::Cached).await.unwrap();
    svc.load(&req, FetchMode::Bypass).await.unwrap();
    assert_eq!(svc.executor().calls(), 2);
    assert!(cache.get(&req.cache_key()).is_some());
}

#[tokio::test]
async fn upstream_failure_is_returned_and_not_cached() {
    let cache = Arc::new(QueryCache::in_memory(10));
    let failure = AppError::upstream("http_500", "relation \"t\" does not exist");
    let exec = ScriptedExecutor { fail: Some(failure.clone()), ..Default::default() };
    let svc = ChartService::new(exec, cache.clone());
    let req = request("select * from t");

    let err = svc.load(&req, FetchMode::Cached).await.unwrap_err();
    assert_eq!(err, failure);
    assert!(err.is_upstream());
    assert!(cache.get(&req.cache_key()).is_none());
}

#[tokio::test]
async fn cancelled_load_leaves_cache_untouched() {
    let cache = Arc::new(QueryCache::in_memory(10));
    let exec = ScriptedExecutor { rows: revenue_rows(), delay: Some(Duration::from_secs(5)), ..Default::default() };
    let svc = ChartService::new(exec, cache.clone());
    let req = request("select slow()");

    let outcome = tokio::time::timeout(Duration::from_millis(20), svc.load(&req, FetchMode::Cached)).await;
    assert!(outcome.is_err());
    assert_eq!(svc.executor().calls(), 1);
    assert!(cache.get(&req.cache_key()).is_none());
}

#[tokio::test]
async fn empty_result_is_a_default_chart() {
    let svc = ChartService::uncached(ScriptedExecutor::default());
    let payload = svc.load(&request("select nothing"), FetchMode::Cached).await.unwrap();
    assert_eq!(payload.config, ChartDataConfig::default());
    assert_eq!(payload.row_count, 0);
}

#[tokio::test]
async fn noop_cache_always_executes() {
    let svc = ChartService::uncached(ScriptedExecutor::rows(revenue_rows()));
    let req = request("select 1");
    let a = svc.load(&req, FetchMode::Cached).await.unwrap();
    let b = svc.load(&req, FetchMode::Cached).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(svc.executor().calls(), 2);
}

#[tokio::test]
async fn invalid_requests_never_reach_the_executor() {
    let svc = ChartService::uncached(ScriptedExecutor::default());
    let err = svc.load(&request("   "), FetchMode::Cached).await.unwrap_err();
    assert_eq!(err.code_str(), "empty_query");
    let mut req = request("select 1");
    req.connection_id.clear();
    let err = svc.load(&req, FetchMode::Cached).await.unwrap_err();
    assert_eq!(err.code_str(), "missing_connection");
    assert_eq!(svc.executor().calls(), 0);
}

#[tokio::test]
async fn hints_and_kind_flow_into_shaping() {
    let rows = vec![json!({"region": "EU", "orders": 3, "revenue": 30}), json!({"region": "US", "orders": 5, "revenue": 50})];
    let svc = ChartService::uncached(ScriptedExecutor::rows(rows));
    let hints = ShapeHints { primary_key: Some("revenue".into()), ..Default::default() };
    let req = ChartRequest::new("msg-9", "conn", "select 1", ChartKind::Pie).with_hints(hints);
    let payload = svc.load(&req, FetchMode::Cached).await.unwrap();
    assert_eq!(payload.config.data[1]["value"], json!(50));
    assert_eq!(payload.config.data[1]["name"], json!("US"));
}

#[test]
fn request_deserializes_with_optional_parts() {
    let req: ChartRequest = serde_json::from_value(json!({
        "chartId": "c", "connectionId": "k", "query": "select 1", "kind": "bar",
        "range": {"fromDate": "2024-01-01"}
    }))
    .unwrap();
    assert_eq!(req.kind, ChartKind::Bar);
    assert!(req.range.from.is_some());
    assert!(req.hints.is_empty());
}
