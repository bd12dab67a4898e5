//! Post lookup through the `ScrapeCreators` post detail API.
//!
//! The full link is tried first. If that fails for any reason, the lookup is repeated
//! with the post shortcode, which also works for `/reels/` links the API does not accept.

use super::shortcode::{extract_shortcode, Shortcode};
use crate::config::{LOOKUP_API_KEY_HEADER, LOOKUP_CONNECT_TIMEOUT, LOOKUP_READ_TIMEOUT};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors produced by the lookup client
#[derive(Debug, Error)]
pub enum LookupError {
    /// The API key is not configured
    #[error("SCRAPE_CREATORS_API_KEY is not set")]
    MissingApiKey,
    /// The link lookup failed and the link carries no shortcode to fall back to
    #[error("could not fetch post details: no usable url or shortcode")]
    InsufficientIdentifiers,
    /// The shortcode lookup returned a non-success status
    #[error("lookup service returned HTTP {status}")]
    Upstream {
        /// Status returned by the service
        status: StatusCode,
    },
    /// Connectivity problem while talking to the service
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Response body was not valid JSON
    #[error("invalid JSON from lookup service: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Lookup client configuration, passed explicitly instead of read from the environment
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// API key sent in the `x-api-key` header
    pub api_key: Option<String>,
    /// Post detail endpoint
    pub endpoint: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Read timeout
    pub read_timeout: Duration,
}

impl LookupConfig {
    /// Configuration for `endpoint` with default timeouts and no API key
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            api_key: None,
            endpoint: endpoint.into(),
            connect_timeout: LOOKUP_CONNECT_TIMEOUT,
            read_timeout: LOOKUP_READ_TIMEOUT,
        }
    }

    /// Sets the API key; empty keys count as missing
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    /// Overrides connect and read timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }
}

/// Source of post details for a link
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostLookup: Send + Sync {
    /// Fetch raw post details for a post link
    async fn fetch_post(&self, link: &str) -> Result<Value, LookupError>;
}

/// Outcome of the lookup by full link
#[derive(Debug)]
enum FirstAttempt {
    /// The service answered with JSON
    Resolved(Value),
    /// The attempt failed; the reason is logged and the shortcode lookup takes over
    Fallback(LookupError),
}

/// HTTP client for the post detail API
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: HttpClient,
    config: LookupConfig,
}

impl LookupClient {
    /// Creates a client with the configured timeouts
    #[must_use]
    pub fn new(config: LookupConfig) -> Self {
        let http = HttpClient::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self { http, config }
    }

    /// Endpoint this client talks to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn get_json(&self, api_key: &str, query: (&str, &str)) -> Result<Value, LookupError> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .header(LOOKUP_API_KEY_HEADER, api_key)
            .query(&[query])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Upstream { status });
        }

        response.json::<Value>().await.map_err(LookupError::Decode)
    }

    async fn lookup_by_url(&self, api_key: &str, link: &str) -> FirstAttempt {
        match self.get_json(api_key, ("url", link)).await {
            Ok(details) => FirstAttempt::Resolved(details),
            Err(e) => FirstAttempt::Fallback(e),
        }
    }

    async fn lookup_by_shortcode(
        &self,
        api_key: &str,
        shortcode: &Shortcode,
    ) -> Result<Value, LookupError> {
        self.get_json(api_key, ("shortcode", shortcode.as_str())).await
    }
}

#[async_trait]
impl PostLookup for LookupClient {
    async fn fetch_post(&self, link: &str) -> Result<Value, LookupError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(LookupError::MissingApiKey)?;

        debug!(link = %link, "Looking up post by url");
        let reason = match self.lookup_by_url(api_key, link).await {
            FirstAttempt::Resolved(details) => return Ok(details),
            FirstAttempt::Fallback(reason) => reason,
        };

        let Some(shortcode) = extract_shortcode(link) else {
            warn!(link = %link, error = %reason, "Url lookup failed and link has no shortcode");
            return Err(LookupError::InsufficientIdentifiers);
        };

        info!(
            shortcode = %shortcode,
            error = %reason,
            "Url lookup failed, retrying by shortcode"
        );
        self.lookup_by_shortcode(api_key, &shortcode).await
    }
}
