use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AnalyticsError, Result};
use crate::options::{redact, IngestOptions, PluginOptions, ServiceAccountKey, DEFAULT_API_BASE};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Pull Google Analytics page metrics into fingerprinted nodes
#[derive(Parser, Clone)]
#[command(
    name = "ga-source",
    about = "Pull Google Analytics page metrics into fingerprinted nodes",
    version
)]
pub struct Settings {
    /// Service account email
    #[arg(long, env = "GA_CLIENT_EMAIL")]
    pub email: Option<String>,

    /// Service account private key (PEM)
    #[arg(long, env = "GA_PRIVATE_KEY", hide_env_values = true, allow_hyphen_values = true)]
    pub key: Option<String>,

    /// Reporting view id (with or without the ga: prefix)
    #[arg(long, env = "GA_VIEW_ID")]
    pub view_id: Option<String>,

    /// First day of the reporting window (YYYY-MM-DD, today, yesterday, NdaysAgo)
    #[arg(long, env = "GA_START_DATE")]
    pub start_date: Option<String>,

    /// Google service account key file (JSON)
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Plugin options file (JSON with email, key, viewId, startDate)
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Write nodes to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Maximum number of per-path rows to request (1-10000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10000))]
    pub max_results: Option<u32>,

    /// HTTP request timeout in seconds (1-300)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout: u64,

    /// Reporting API base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// OAuth token endpoint (overrides the credentials file)
    #[arg(long)]
    pub token_uri: Option<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("email", &self.email)
            .field("key", &redact(&self.key))
            .field("view_id", &self.view_id)
            .field("start_date", &self.start_date)
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .field("output", &self.output)
            .field("max_results", &self.max_results)
            .field("timeout", &self.timeout)
            .field("api_base", &self.api_base)
            .field("token_uri", &self.token_uri)
            .field("log_level", &self.log_level)
            .field("debug", &self.debug)
            .finish()
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and apply the `--debug` flag.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// HTTP timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Merge every configuration source into validated [`IngestOptions`].
    ///
    /// Precedence, highest first: CLI flags / environment, the credentials
    /// file, the plugin options file.
    pub fn ingest_options(&self) -> Result<IngestOptions> {
        let plugin = match &self.options {
            Some(path) => PluginOptions::load_from(path)?,
            None => PluginOptions::default(),
        };
        let account = match &self.credentials {
            Some(path) => Some(ServiceAccountKey::load_from(path)?),
            None => None,
        };

        let email = self
            .email
            .clone()
            .or_else(|| account.as_ref().map(|a| a.client_email.clone()))
            .or(plugin.email)
            .ok_or_else(|| AnalyticsError::config("service account email is required"))?;
        let key = self
            .key
            .clone()
            .or_else(|| account.as_ref().map(|a| a.private_key.clone()))
            .or(plugin.key)
            .ok_or_else(|| AnalyticsError::config("private key is required"))?;
        let view_id = self
            .view_id
            .clone()
            .or(plugin.view_id)
            .ok_or_else(|| AnalyticsError::config("view id is required"))?;
        let start_date = self.start_date.clone().or(plugin.start_date);

        let mut opts = IngestOptions::new(&email, &key, &view_id, start_date.as_deref())?;

        let token_uri = self
            .token_uri
            .clone()
            .or_else(|| account.and_then(|a| a.token_uri));
        if let Some(uri) = token_uri {
            opts = opts.with_token_uri(uri);
        }

        tracing::debug!(
            view = %opts.view_id,
            start = opts.start_date.as_deref().unwrap_or("default"),
            "resolved ingestion options"
        );

        Ok(opts)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
