//! Core Reporting API v3 queries.
//!
//! Two read-only queries are issued per run: an unsegmented site-wide
//! aggregate and a per-path breakdown sorted by page views.

use std::time::Duration;

use analytics_core::dates::DateRange;
use analytics_core::options::ViewId;
use analytics_core::{AnalyticsError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::auth::AccessToken;
use crate::rows::ReportResponse;

pub const METRIC_PAGEVIEWS: &str = "ga:pageviews";
pub const METRIC_SESSIONS: &str = "ga:sessions";
pub const DIMENSION_PAGE_PATH: &str = "ga:pagePath";

/// Sort order of the per-path query: most viewed first.
pub const SORT_BY_PAGEVIEWS_DESC: &str = "-ga:pageviews";

// ── ReportQuery ───────────────────────────────────────────────────────────────

/// Parameters of one `data/ga` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub ids: String,
    pub start_date: String,
    pub end_date: String,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub sort: Option<String>,
    pub max_results: Option<u32>,
}

impl ReportQuery {
    /// Page views and sessions across the whole property.
    pub fn site_wide(view: &ViewId, range: &DateRange) -> Self {
        Self {
            ids: view.ids(),
            start_date: range.start_param(),
            end_date: range.end_param(),
            metrics: vec![METRIC_PAGEVIEWS.to_string(), METRIC_SESSIONS.to_string()],
            dimensions: Vec::new(),
            sort: None,
            max_results: None,
        }
    }

    /// Page views and sessions per URL path, most viewed first.
    pub fn per_path(view: &ViewId, range: &DateRange) -> Self {
        Self {
            dimensions: vec![DIMENSION_PAGE_PATH.to_string()],
            sort: Some(SORT_BY_PAGEVIEWS_DESC.to_string()),
            ..Self::site_wide(view, range)
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Query-string pairs in the order the API documents them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ids", self.ids.clone()),
            ("start-date", self.start_date.clone()),
            ("end-date", self.end_date.clone()),
            ("metrics", self.metrics.join(",")),
        ];
        if !self.dimensions.is_empty() {
            params.push(("dimensions", self.dimensions.join(",")));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(max) = self.max_results {
            params.push(("max-results", max.to_string()));
        }
        params
    }
}

// ── ReportingApi ──────────────────────────────────────────────────────────────

/// A read-only reporting endpoint.
#[async_trait]
pub trait ReportingApi: Send + Sync {
    async fn get(&self, token: &AccessToken, query: &ReportQuery) -> Result<ReportResponse>;
}

/// [`ReportingApi`] over HTTPS with bearer authentication.
pub struct HttpReportingClient {
    base_url: String,
    http: Client,
}

impl HttpReportingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AnalyticsError::Other(anyhow::Error::new(e).context("failed to construct reqwest client"))
            })?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/data/ga", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReportingApi for HttpReportingClient {
    async fn get(&self, token: &AccessToken, query: &ReportQuery) -> Result<ReportResponse> {
        debug!(
            ids = %query.ids,
            start = %query.start_date,
            dimensions = %query.dimensions.join(","),
            "issuing reporting query"
        );

        let response = self
            .http
            .get(self.endpoint())
            .bearer_auth(&token.token)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| AnalyticsError::remote_query(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AnalyticsError::remote_query(format!(
                "failed to read response body (status {}): {}",
                status, e
            ))
        })?;

        if !status.is_success() {
            return Err(AnalyticsError::remote_query(format!(
                "reporting API returned {}: {}",
                status,
                text.trim()
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| AnalyticsError::remote_query(format!("unexpected response shape: {}", e)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{plain_client, serve};

    fn view() -> ViewId {
        ViewId::parse("ga:123").unwrap()
    }

    // ── query building ────────────────────────────────────────────────────

    #[test]
    fn test_site_wide_query_params() {
        let query = ReportQuery::site_wide(&view(), &DateRange::default());
        assert_eq!(
            query.params(),
            vec![
                ("ids", "ga:123".to_string()),
                ("start-date", "2009-01-01".to_string()),
                ("end-date", "today".to_string()),
                ("metrics", "ga:pageviews,ga:sessions".to_string()),
            ]
        );
    }

    #[test]
    fn test_per_path_query_params() {
        let query = ReportQuery::per_path(&view(), &DateRange::default()).with_max_results(500);
        let params = query.params();
        assert!(params.contains(&("dimensions", "ga:pagePath".to_string())));
        assert!(params.contains(&("sort", "-ga:pageviews".to_string())));
        assert!(params.contains(&("max-results", "500".to_string())));
        assert_eq!(query.metrics, vec!["ga:pageviews", "ga:sessions"]);
    }

    // ── HTTP client ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_sends_bearer_and_params() {
        let (base, server) = serve(vec![(
            200,
            r#"{"columnHeaders":[{"name":"ga:pageviews"},{"name":"ga:sessions"}],"rows":[["100","80"]]}"#
                .to_string(),
        )])
        .await;

        let client = HttpReportingClient::with_client(format!("{}/", base), plain_client());
        let query = ReportQuery::site_wide(&view(), &DateRange::default());
        let response = client
            .get(&AccessToken::new("ya29.test"), &query)
            .await
            .expect("response");
        assert_eq!(response.rows.len(), 1);

        let requests = server.await.expect("server");
        let request = &requests[0];
        assert!(request.starts_with("GET /data/ga?"));
        assert!(request.contains("ids=ga%3A123"));
        assert!(request.contains("start-date=2009-01-01"));
        assert!(request.contains("end-date=today"));
        assert!(request.contains("metrics=ga%3Apageviews%2Cga%3Asessions"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer ya29.test"));
    }

    #[tokio::test]
    async fn test_get_non_success_status() {
        let (base, server) = serve(vec![(
            403,
            r#"{"error":{"code":403,"message":"User does not have any Google Analytics account."}}"#
                .to_string(),
        )])
        .await;

        let client = HttpReportingClient::with_client(base, plain_client());
        let query = ReportQuery::site_wide(&view(), &DateRange::default());
        let err = client.get(&AccessToken::new("t"), &query).await.unwrap_err();
        assert!(err.is_remote_query());
        assert!(err.to_string().contains("403"));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_get_unexpected_shape() {
        let (base, server) = serve(vec![(200, r#"{"kind":"analytics#gaData"}"#.to_string())]).await;

        let client = HttpReportingClient::with_client(base, plain_client());
        let query = ReportQuery::site_wide(&view(), &DateRange::default());
        let err = client.get(&AccessToken::new("t"), &query).await.unwrap_err();
        assert!(err.is_remote_query());
        assert!(err.to_string().contains("unexpected response shape"));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_get_connection_refused() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpReportingClient::with_client(format!("http://{}", addr), plain_client());
        let query = ReportQuery::site_wide(&view(), &DateRange::default());
        let err = client.get(&AccessToken::new("t"), &query).await.unwrap_err();
        assert!(err.is_remote_query());
    }
}
