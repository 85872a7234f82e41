//! Single-pass analytics ingestion.
//!
//! One run authenticates, fetches the site-wide aggregate and emits it, then
//! fetches the per-path breakdown and emits it. Nothing is retried or cached.
//! If the per-path query fails, the site-wide node has already reached the
//! sink and stays there.

use std::time::{Duration, Instant};

use analytics_core::dates::DateRange;
use analytics_core::models::{NodeRecord, NodeSource};
use analytics_core::options::{IngestOptions, ViewId};
use analytics_core::Result;
use analytics_source::auth::{JwtTokenSource, ServiceAccountCredentials, TokenSource};
use analytics_source::reporting::{HttpReportingClient, ReportQuery, ReportingApi};
use analytics_source::rows::ReportResponse;
use tracing::{debug, info, warn};

use crate::sink::NodeSink;

// ── IngestReport ──────────────────────────────────────────────────────────────

/// Nodes emitted by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub site_wide: usize,
    pub page_paths: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.site_wide + self.page_paths
    }
}

// ── AnalyticsIngestor ─────────────────────────────────────────────────────────

/// Turns the two reporting queries into fingerprinted nodes.
pub struct AnalyticsIngestor<T, R> {
    tokens: T,
    api: R,
    view: ViewId,
    range: DateRange,
    max_results: Option<u32>,
}

impl AnalyticsIngestor<JwtTokenSource, HttpReportingClient> {
    /// Ingestor talking to the real token endpoint and reporting API.
    pub fn connect(opts: &IngestOptions, api_base: &str, timeout: Duration) -> Result<Self> {
        let tokens = JwtTokenSource::new(ServiceAccountCredentials::from_options(opts), timeout)?;
        let api = HttpReportingClient::new(api_base, timeout)?;
        Self::new(tokens, api, opts)
    }
}

impl<T: TokenSource, R: ReportingApi> AnalyticsIngestor<T, R> {
    pub fn new(tokens: T, api: R, opts: &IngestOptions) -> Result<Self> {
        Ok(Self {
            tokens,
            api,
            view: opts.view_id.clone(),
            range: opts.date_range()?,
            max_results: None,
        })
    }

    /// Cap the number of per-path rows requested.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn date_range(&self) -> &DateRange {
        &self.range
    }

    /// Run one ingestion, emitting every node into `sink`.
    pub async fn run<S: NodeSink + ?Sized>(&self, sink: &mut S) -> Result<IngestReport> {
        let started = Instant::now();
        let mut report = IngestReport::default();

        let token = self.tokens.access_token().await?;
        debug!(expires_in = ?token.expires_in, "access token obtained");

        let site_query = ReportQuery::site_wide(&self.view, &self.range);
        let site = self.api.get(&token, &site_query).await?;
        warn_if_sampled(&site, "site-wide");
        let site_stats = site.site_wide_stats()?;
        if site_stats.len() > 1 {
            warn!(
                rows = site_stats.len(),
                "site-wide query returned more than one row; all share the same id"
            );
        }
        report.site_wide = emit(sink, &site_stats)?;

        let mut path_query = ReportQuery::per_path(&self.view, &self.range);
        if let Some(max) = self.max_results {
            path_query = path_query.with_max_results(max);
        }
        let per_path = self.api.get(&token, &path_query).await?;
        warn_if_sampled(&per_path, "per-path");
        report.page_paths = emit(sink, &per_path.page_path_stats()?)?;

        info!(
            view = %self.view,
            start = %self.range.start_param(),
            site_wide = report.site_wide,
            page_paths = report.page_paths,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analytics ingestion complete"
        );

        Ok(report)
    }
}

fn emit<S: NodeSink + ?Sized, N: NodeSource>(sink: &mut S, records: &[N]) -> Result<usize> {
    for record in records {
        sink.create_node(NodeRecord::from_source(record)?)?;
    }
    Ok(records.len())
}

fn warn_if_sampled(response: &ReportResponse, label: &str) {
    if response.contains_sampled_data == Some(true) {
        warn!(query = label, "reporting API returned sampled data");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
