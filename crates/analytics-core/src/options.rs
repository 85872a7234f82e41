//! Ingestion options: the credential, the reporting view and the start date.
//!
//! Options can come from a plugin-options JSON file, a Google service-account
//! key file, or be assembled directly. [`IngestOptions::new`] is the single
//! validation point.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dates::{DateRange, DateSpec};
use crate::error::{AnalyticsError, Result};

/// OAuth scope requested for every access token.
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Token endpoint used when the credential does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Base URL of the Core Reporting API v3.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/analytics/v3";

// ── ViewId ────────────────────────────────────────────────────────────────────

/// Numeric reporting view identifier, accepted with or without `ga:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewId(String);

impl ViewId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("ga:").unwrap_or(trimmed);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AnalyticsError::config(format!(
                "view id must be numeric (optionally prefixed with ga:), got \"{}\"",
                raw
            )));
        }
        Ok(Self(digits.to_string()))
    }

    /// Value for the `ids` query parameter.
    pub fn ids(&self) -> String {
        format!("ga:{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turn literal `\n` escapes (common when a PEM travels through an
/// environment variable) into real newlines.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n").trim().to_string()
}

/// Placeholder printed instead of key material in `Debug` output.
pub const REDACTED: &str = "<redacted>";

/// `Debug` stand-in for an optional secret.
pub(crate) fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| REDACTED)
}

// ── PluginOptions ─────────────────────────────────────────────────────────────

/// Plugin options file: `{ "email", "key", "viewId", "startDate" }`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

impl fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOptions")
            .field("email", &self.email)
            .field("key", &redact(&self.key))
            .field("view_id", &self.view_id)
            .field("start_date", &self.start_date)
            .finish()
    }
}

impl PluginOptions {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = read_file(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

// ── ServiceAccountKey ─────────────────────────────────────────────────────────

/// The subset of a Google service-account key file used here.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &REDACTED)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = read_file(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| AnalyticsError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── IngestOptions ─────────────────────────────────────────────────────────────

/// Validated configuration bundle for one ingestion run.
#[derive(Clone)]
pub struct IngestOptions {
    pub service_account_email: String,
    pub private_key: String,
    pub view_id: ViewId,
    pub start_date: Option<String>,
    pub token_uri: String,
}

impl fmt::Debug for IngestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestOptions")
            .field("service_account_email", &self.service_account_email)
            .field("private_key", &REDACTED)
            .field("view_id", &self.view_id)
            .field("start_date", &self.start_date)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl IngestOptions {
    pub fn new(
        service_account_email: &str,
        private_key: &str,
        view_id: &str,
        start_date: Option<&str>,
    ) -> Result<Self> {
        let email = service_account_email.trim();
        if email.is_empty() {
            return Err(AnalyticsError::config("service account email is required"));
        }
        if !email.contains('@') {
            return Err(AnalyticsError::config(format!(
                "service account email looks invalid: \"{}\"",
                email
            )));
        }

        let private_key = normalize_private_key(private_key);
        if private_key.is_empty() {
            return Err(AnalyticsError::config("private key is required"));
        }

        let view_id = ViewId::parse(view_id)?;

        let start_date = start_date
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if let Some(raw) = start_date.as_deref() {
            raw.parse::<DateSpec>()?;
        }

        Ok(Self {
            service_account_email: email.to_string(),
            private_key,
            view_id,
            start_date,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        })
    }

    /// Override the OAuth token endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Reporting window `[start_date, today]`.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::from_start(self.start_date.as_deref())
    }
}
