//! Service-account authentication.
//!
//! Builds an RS256-signed JWT assertion from the service account email and
//! private key, then exchanges it at the OAuth token endpoint for a
//! short-lived bearer token. Any failure here is an
//! [`AnalyticsError::Authentication`].

use std::fmt;
use std::time::Duration;

use analytics_core::options::{IngestOptions, ANALYTICS_READONLY_SCOPE, REDACTED};
use analytics_core::{AnalyticsError, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OAuth grant type for signed JWT assertions.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion; the token endpoint caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

// ── Credentials ───────────────────────────────────────────────────────────────

/// Claims carried by the signed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A service account able to sign token requests.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &REDACTED)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountCredentials {
    pub fn from_options(opts: &IngestOptions) -> Self {
        Self {
            client_email: opts.service_account_email.clone(),
            private_key: opts.private_key.clone(),
            token_uri: opts.token_uri.clone(),
        }
    }

    /// Read-only analytics claims issued at `now` (unix seconds).
    pub fn claims_at(&self, now: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: ANALYTICS_READONLY_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign the assertion for `now`.
    pub fn signed_assertion_at(&self, now: i64) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            AnalyticsError::authentication(format!("malformed private key: {}", e))
        })?;
        encode(&Header::new(Algorithm::RS256), &self.claims_at(now), &key)
            .map_err(|e| AnalyticsError::authentication(format!("failed to sign assertion: {}", e)))
    }

    /// Sign the assertion for the current time.
    pub fn signed_assertion(&self) -> Result<String> {
        self.signed_assertion_at(Utc::now().timestamp())
    }
}

// ── AccessToken ───────────────────────────────────────────────────────────────

/// Short-lived bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_in: None,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &REDACTED)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

// ── TokenSource ───────────────────────────────────────────────────────────────

/// Anything able to hand out a bearer token for the reporting API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

/// Exchanges a signed service-account assertion for an access token.
pub struct JwtTokenSource {
    credentials: ServiceAccountCredentials,
    http: Client,
}

impl JwtTokenSource {
    pub fn new(credentials: ServiceAccountCredentials, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AnalyticsError::Other(anyhow::Error::new(e).context("failed to construct reqwest client"))
            })?;
        Ok(Self::with_client(credentials, http))
    }

    pub fn with_client(credentials: ServiceAccountCredentials, http: Client) -> Self {
        Self { credentials, http }
    }
}

#[async_trait]
impl TokenSource for JwtTokenSource {
    async fn access_token(&self) -> Result<AccessToken> {
        let assertion = self.credentials.signed_assertion()?;

        debug!(
            account = %self.credentials.client_email,
            token_uri = %self.credentials.token_uri,
            "requesting access token"
        );

        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AnalyticsError::authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AnalyticsError::authentication(format!(
                "failed to read token response (status {}): {}",
                status, e
            ))
        })?;

        if !status.is_success() {
            return Err(AnalyticsError::authentication(format!(
                "token endpoint returned {}: {}",
                status,
                text.trim()
            )));
        }

        let body: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            AnalyticsError::authentication(format!("invalid token response: {}", e))
        })?;
        if body.access_token.is_empty() {
            return Err(AnalyticsError::authentication(
                "token response carried no access_token",
            ));
        }

        Ok(AccessToken {
            token: body.access_token,
            expires_in: body.expires_in,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
