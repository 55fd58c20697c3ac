//! Query-execution collaborator.
//!
//! The chart service never talks to a database itself; it hands the query text to a
//! `QueryExecutor` and shapes whatever rows come back. Retries, timeouts and
//! cancellation are the executor's business. `HttpQueryExecutor` is the production
//! implementation against the query service's HTTP API.

use std::future::Future;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::DateRange;
use crate::config::ExecutorSettings;
use crate::error::{AppError, AppResult};

/// Rows plus the metadata the query service reports with them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Set when the query service answered from its own cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
}

impl QueryResponse {
    pub fn from_rows(rows: Vec<Value>) -> Self { Self { rows, ..Default::default() } }
}

pub trait QueryExecutor: Send + Sync {
    /// Run `query` on `connection_id`. Any row set, including an empty one, is a success.
    fn execute(&self, connection_id: &str, query: &str, range: DateRange) -> impl Future<Output = AppResult<QueryResponse>> + Send;
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    #[serde(flatten)]
    range: DateRange,
}

/// POSTs `{query, fromDate?, toDate?}` to `{base}/connections/{id}/query`.
#[derive(Debug, Clone)]
pub struct HttpQueryExecutor {
    base: Url,
    client: reqwest::Client,
    bearer: Option<String>,
}

impl HttpQueryExecutor {
    pub fn new(settings: &ExecutorSettings) -> AppResult<Self> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| AppError::user("invalid_base_url".to_string(), format!("{}: {}", settings.base_url, e)))?;
        let client = reqwest::Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self { base, client, bearer: None })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn query_url(&self, connection_id: &str) -> AppResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::user("invalid_base_url".to_string(), format!("{} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(["connections", connection_id, "query"]);
        Ok(url)
    }
}

impl QueryExecutor for HttpQueryExecutor {
    async fn execute(&self, connection_id: &str, query: &str, range: DateRange) -> AppResult<QueryResponse> {
        let url = self.query_url(connection_id)?;
        debug!(target: "querychart::exec", url=%url, "posting query");
        let mut req = self.client.post(url).json(&QueryBody { query, range });
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
            warn!(target: "querychart::exec", status=%status, "query failed: {}", message);
            return Err(AppError::upstream(format!("http_{}", status.as_u16()), message));
        }
        let out: QueryResponse = resp.json().await?;
        debug!(target: "querychart::exec", rows=out.rows.len(), "query answered");
        Ok(out)
    }
}

/// `error` or `message` from a JSON error body, else the trimmed body text.
fn error_message(body: &str) -> Option<String> {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        if let Some(m) = ["error", "message"].iter().find_map(|k| v.get(*k).and_then(|m| m.as_str())) {
            return Some(m.to_string());
        }
    }
    let t = body.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn executor(base: &str) -> HttpQueryExecutor {
        HttpQueryExecutor::new(&ExecutorSettings { base_url: base.to_string(), timeout_ms: 1_000 }).unwrap()
    }

    #[test]
    fn query_url_appends_escaped_segments() {
        let url = executor("http://svc:8080/api/").query_url("conn 1").unwrap();
        assert_eq!(url.as_str(), "http://svc:8080/api/connections/conn%201/query");
        let url = executor("http://svc:8080").query_url("c").unwrap();
        assert_eq!(url.as_str(), "http://svc:8080/connections/c/query");
    }

    #[test]
    fn bad_base_url_is_user_error() {
        let err = HttpQueryExecutor::new(&ExecutorSettings { base_url: "not a url".into(), timeout_ms: 1 }).unwrap_err();
        assert_eq!(err.code_str(), "invalid_base_url");
    }

    #[test]
    fn body_carries_optional_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1);
        let body = serde_json::to_value(QueryBody { query: "select 1", range: DateRange::new(d, None) }).unwrap();
        assert_eq!(body, json!({"query": "select 1", "fromDate": "2024-03-01"}));
    }

    #[test]
    fn response_decodes_camel_case_with_defaults() {
        let r: QueryResponse = serde_json::from_value(json!({"rows": [{"a": 1}], "rowCount": 1, "executionTimeMs": 12})).unwrap();
        assert_eq!(r.row_count, Some(1));
        assert_eq!(r.execution_time_ms, Some(12));
        assert!(r.cached_at.is_none());
        let empty: QueryResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.rows.is_empty());
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(error_message(r#"{"error":"relation missing"}"#).as_deref(), Some("relation missing"));
        assert_eq!(error_message("  gateway down ").as_deref(), Some("gateway down"));
        assert_eq!(error_message(""), None);
    }
}
