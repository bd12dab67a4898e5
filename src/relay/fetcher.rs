//! Bounded, retrying media download into memory.
//!
//! The body is read in fixed-size chunks and the download is abandoned as soon as the
//! byte budget is exceeded. Only timeouts are retried, with a linear backoff.

use crate::config::{
    FETCH_BACKOFF_STEP, FETCH_CHUNK_SIZE, FETCH_CONNECT_TIMEOUT, FETCH_MAX_ATTEMPTS,
    FETCH_READ_TIMEOUT, MAX_VIDEO_BYTES, VIDEO_FILE_NAME,
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{Client as HttpClient, StatusCode};
use std::io::{self, Cursor};
use std::pin::pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio_retry::RetryIf;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

/// Errors produced while downloading media
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connect or read timeout; retried until attempts run out
    #[error("media download timed out: {0}")]
    Timeout(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The media host answered with a non-success status
    #[error("media host returned HTTP {0}")]
    Status(StatusCode),
    /// Any other request failure
    #[error("media request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// The body stream broke for a reason other than a timeout
    #[error("failed to read media stream: {0}")]
    Read(#[source] io::Error),
}

impl FetchError {
    /// Whether the error is a transient timeout worth retrying
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Box::new(err))
        } else {
            Self::Request(err)
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        let body_timeout = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout);

        if body_timeout || err.kind() == io::ErrorKind::TimedOut {
            Self::Timeout(Box::new(err))
        } else {
            Self::Read(err)
        }
    }
}

/// Fetcher tuning
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Largest payload kept in memory
    pub max_bytes: u64,
    /// Size of a single read from the body stream
    pub chunk_size: usize,
    /// Total attempts, first one included
    pub max_attempts: u32,
    /// The n-th retry waits `n * backoff_step`
    pub backoff_step: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Read timeout
    pub read_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_VIDEO_BYTES,
            chunk_size: FETCH_CHUNK_SIZE,
            max_attempts: FETCH_MAX_ATTEMPTS,
            backoff_step: FETCH_BACKOFF_STEP,
            connect_timeout: FETCH_CONNECT_TIMEOUT,
            read_timeout: FETCH_READ_TIMEOUT,
        }
    }
}

impl FetchConfig {
    /// Sets the byte budget
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the linear backoff step
    #[must_use]
    pub const fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
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

/// Delays growing linearly: `step`, `2 * step`, `3 * step`, ...
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    retries: u32,
}

impl LinearBackoff {
    /// Backoff starting at `step`
    #[must_use]
    pub const fn new(step: Duration) -> Self {
        Self { step, retries: 0 }
    }
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.retries = self.retries.saturating_add(1);
        Some(self.step.saturating_mul(self.retries))
    }
}

/// A fully downloaded media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    data: Vec<u8>,
    file_name: String,
}

impl MediaPayload {
    /// Wraps downloaded bytes under the default video file name
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            file_name: VIDEO_FILE_NAME.to_string(),
        }
    }

    /// Suggested file name for uploads
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Downloaded bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reader positioned at the start of the payload
    #[must_use]
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.data)
    }

    /// Splits into file name and bytes
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.file_name, self.data)
    }
}

/// Downloads media by direct URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download `url` into memory.
    ///
    /// Returns `Ok(None)` when the file is larger than the byte budget.
    async fn download(&self, url: &str) -> Result<Option<MediaPayload>, FetchError>;
}

/// HTTP media fetcher
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    http: HttpClient,
    config: FetchConfig,
}

impl MediaFetcher {
    /// Creates a fetcher with the configured timeouts
    #[must_use]
    pub fn new(config: FetchConfig) -> Self {
        let http = HttpClient::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self { http, config }
    }

    /// Byte budget of this fetcher
    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    /// Downloads `url`, retrying timeouts with linear backoff.
    ///
    /// # Errors
    ///
    /// Returns the first non-timeout error, or the last timeout once all attempts fail.
    pub async fn fetch(&self, url: &str) -> Result<Option<MediaPayload>, FetchError> {
        let retries = self.config.max_attempts.saturating_sub(1) as usize;
        let strategy = LinearBackoff::new(self.config.backoff_step).take(retries);
        let mut attempt = 0u32;

        RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                debug!(attempt, url = %url, "Downloading media");
                self.fetch_once(url)
            },
            |e: &FetchError| {
                if e.is_timeout() {
                    warn!(error = %e, "Media download timed out");
                    true
                } else {
                    false
                }
            },
        )
        .await
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<MediaPayload>, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let max_bytes = self.config.max_bytes;
        let capacity = response
            .content_length()
            .map_or(0, |len| len.min(max_bytes));
        let mut buffer = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));

        let stream = response.bytes_stream().map_err(io::Error::other);
        let mut reader = pin!(StreamReader::new(stream));
        let mut chunk = vec![0u8; self.config.chunk_size.max(1)];

        loop {
            let read = reader.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            if (buffer.len() + read) as u64 > max_bytes {
                info!(
                    url = %url,
                    max_bytes,
                    "Media exceeds byte budget, download abandoned"
                );
                return Ok(None);
            }
            buffer.extend_from_slice(&chunk[..read]);
        }

        debug!(bytes = buffer.len(), "Media downloaded");
        Ok(Some(MediaPayload::new(buffer)))
    }
}

#[async_trait]
impl MediaDownloader for MediaFetcher {
    async fn download(&self, url: &str) -> Result<Option<MediaPayload>, FetchError> {
        self.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let delays: Vec<_> = LinearBackoff::new(Duration::from_millis(1500))
            .take(2)
            .collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(1500), Duration::from_millis(3000)]
        );
    }

    #[test]
    fn test_payload_reads_from_start() {
        let payload = MediaPayload::new(b"video-bytes".to_vec());
        assert_eq!(payload.file_name(), "reel.mp4");
        assert_eq!(payload.len(), 11);

        let reader = payload.into_reader();
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.into_inner(), b"video-bytes".to_vec());
    }

    #[test]
    fn test_io_timeout_is_retryable() {
        let err = FetchError::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(err.is_timeout());

        let err = FetchError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(!err.is_timeout());
        assert!(!FetchError::Status(StatusCode::FORBIDDEN).is_timeout());
    }

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.max_bytes, 49 * 1024 * 1024);
        assert_eq!(config.chunk_size, 128 * 1024);
        assert_eq!(config.max_attempts, 3);
        assert!(config.read_timeout > crate::config::LOOKUP_READ_TIMEOUT);
    }
}
