//! Reporting responses and named-column row parsing.
//!
//! Cells are located through `columnHeaders` by name rather than by
//! position, and every row is checked against the header width. Anything
//! that does not fit is a [`AnalyticsError::RemoteQuery`].

use analytics_core::models::{PagePathStat, SiteWideStat};
use analytics_core::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reporting::{DIMENSION_PAGE_PATH, METRIC_PAGEVIEWS, METRIC_SESSIONS};

/// One column of a reporting response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnHeader {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            column_type: None,
            data_type: None,
        }
    }
}

/// The parts of a `data/ga` response this crate reads.
///
/// The API omits `rows` entirely when a query matches nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub column_headers: Vec<ColumnHeader>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_sampled_data: Option<bool>,
}

impl ReportResponse {
    /// Index of the column called `name`.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.column_headers
            .iter()
            .position(|h| h.name == name)
            .ok_or_else(|| {
                AnalyticsError::remote_query(format!(
                    "response is missing expected column {} (got [{}])",
                    name,
                    self.column_headers
                        .iter()
                        .map(|h| h.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    /// Rows of the unsegmented site-wide query.
    pub fn site_wide_stats(&self) -> Result<Vec<SiteWideStat>> {
        let views = self.column(METRIC_PAGEVIEWS)?;
        let sessions = self.column(METRIC_SESSIONS)?;

        self.checked_rows()?
            .map(|(i, row)| -> Result<SiteWideStat> {
                Ok(SiteWideStat {
                    page_views: metric_cell(row, views, METRIC_PAGEVIEWS, i)?,
                    sessions: metric_cell(row, sessions, METRIC_SESSIONS, i)?,
                })
            })
            .collect()
    }

    /// Rows of the per-path query, in response order.
    pub fn page_path_stats(&self) -> Result<Vec<PagePathStat>> {
        let path = self.column(DIMENSION_PAGE_PATH)?;
        let views = self.column(METRIC_PAGEVIEWS)?;
        let sessions = self.column(METRIC_SESSIONS)?;

        self.checked_rows()?
            .map(|(i, row)| -> Result<PagePathStat> {
                Ok(PagePathStat {
                    path: text_cell(row, path, DIMENSION_PAGE_PATH, i)?,
                    total_count: metric_cell(row, views, METRIC_PAGEVIEWS, i)?,
                    sessions: metric_cell(row, sessions, METRIC_SESSIONS, i)?,
                })
            })
            .collect()
    }

    /// Rows paired with their index, after every row has been checked
    /// against the header width.
    fn checked_rows(&self) -> Result<impl Iterator<Item = (usize, &Vec<Value>)>> {
        let width = self.column_headers.len();
        if let Some((i, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
        {
            return Err(AnalyticsError::remote_query(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                width
            )));
        }
        Ok(self.rows.iter().enumerate())
    }
}

fn metric_cell(row: &[Value], col: usize, name: &str, row_index: usize) -> Result<u64> {
    let parsed = match &row[col] {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        AnalyticsError::remote_query(format!(
            "row {}: {} is not a non-negative integer: {}",
            row_index, name, row[col]
        ))
    })
}

fn text_cell(row: &[Value], col: usize, name: &str, row_index: usize) -> Result<String> {
    match &row[col] {
        Value::String(s) => Ok(s.clone()),
        other => Err(AnalyticsError::remote_query(format!(
            "row {}: {} is not a string: {}",
            row_index, name, other
        ))),
    }
}
