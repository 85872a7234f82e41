//! Reporting date ranges.
//!
//! The reporting API accepts `YYYY-MM-DD`, `today`, `yesterday` and
//! `NdaysAgo`. Queries always end `today`; only the start is configurable.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::error::{AnalyticsError, Result};

/// Start date used when none is configured.
pub const DEFAULT_START_DATE: &str = "2009-01-01";

// ── DateSpec ──────────────────────────────────────────────────────────────────

/// One end of a reporting date range, in a form the API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    Absolute(NaiveDate),
    Today,
    Yesterday,
    DaysAgo(u32),
}

fn days_ago_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)daysAgo$").expect("regex is valid"))
}

impl FromStr for DateSpec {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "today" => return Ok(DateSpec::Today),
            "yesterday" => return Ok(DateSpec::Yesterday),
            _ => {}
        }

        if let Some(caps) = days_ago_pattern().captures(s) {
            let n = caps[1]
                .parse::<u32>()
                .map_err(|_| AnalyticsError::config(format!("day offset out of range: {}", s)))?;
            return Ok(DateSpec::DaysAgo(n));
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(DateSpec::Absolute)
            .map_err(|_| {
                AnalyticsError::config(format!(
                    "invalid date \"{}\" (expected YYYY-MM-DD, today, yesterday or NdaysAgo)",
                    s
                ))
            })
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSpec::Absolute(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateSpec::Today => f.write_str("today"),
            DateSpec::Yesterday => f.write_str("yesterday"),
            DateSpec::DaysAgo(n) => write!(f, "{}daysAgo", n),
        }
    }
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive `[start, today]` reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateSpec,
    pub end: DateSpec,
}

impl DateRange {
    /// Build the range from an optional start date, validated against the
    /// local calendar date with one day of slack.
    pub fn from_start(start: Option<&str>) -> Result<Self> {
        Self::from_start_on(start, Local::now().date_naive())
    }

    /// Same as [`DateRange::from_start`] with an explicit `today`.
    ///
    /// The API resolves `today` in the view's timezone, which may be a day
    /// ahead of the local calendar, so a start of local tomorrow is accepted.
    pub fn from_start_on(start: Option<&str>, today: NaiveDate) -> Result<Self> {
        let raw = start
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_START_DATE);
        let start: DateSpec = raw.parse()?;

        if let DateSpec::Absolute(date) = start {
            let latest = today.succ_opt().unwrap_or(today);
            if date > latest {
                return Err(AnalyticsError::config(format!(
                    "start date {} is after today ({})",
                    date, today
                )));
            }
        }

        Ok(Self {
            start,
            end: DateSpec::Today,
        })
    }

    /// Value for the `start-date` query parameter.
    pub fn start_param(&self) -> String {
        self.start.to_string()
    }

    /// Value for the `end-date` query parameter.
    pub fn end_param(&self) -> String {
        self.end.to_string()
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: DateSpec::Absolute(
                NaiveDate::from_ymd_opt(2009, 1, 1).unwrap_or(NaiveDate::MIN),
            ),
            end: DateSpec::Today,
        }
    }
}
