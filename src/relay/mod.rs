//! Post relay pipeline: link → shortcode → lookup → media URL → download.
//!
//! Every request runs the stages sequentially and shares nothing mutable with other
//! requests, so a single [`Relay`] can serve any number of concurrent tasks.

/// Bounded media download
pub mod fetcher;
/// Lookup service client
pub mod lookup;
/// Media URL discovery in lookup responses
pub mod resolver;
/// Link detection and shortcode extraction
pub mod shortcode;

use crate::config::Settings;
use fetcher::{FetchError, MediaDownloader, MediaFetcher, MediaPayload};
use lookup::{LookupClient, LookupError, PostLookup};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that abort a relay request
#[derive(Debug, Error)]
pub enum RelayError {
    /// Post details could not be obtained
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// The media file could not be downloaded
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result of a relay request that did not fail
#[derive(Debug)]
pub enum RelayOutcome {
    /// The video was downloaded and can be uploaded
    Video(MediaPayload),
    /// The lookup response contains no direct media URL (private or deleted post)
    NoVideo,
    /// The video is larger than the byte budget; only its direct URL can be shared
    TooLarge {
        /// Direct media URL
        url: String,
    },
}

/// Composes lookup, resolution and download for one post link at a time
#[derive(Clone)]
pub struct Relay {
    lookup: Arc<dyn PostLookup>,
    downloader: Arc<dyn MediaDownloader>,
}

impl Relay {
    /// Creates a relay from explicit stage implementations
    #[must_use]
    pub fn new(lookup: Arc<dyn PostLookup>, downloader: Arc<dyn MediaDownloader>) -> Self {
        Self { lookup, downloader }
    }

    /// Creates the HTTP-backed relay described by `settings`
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(LookupClient::new(settings.lookup_config())),
            Arc::new(MediaFetcher::new(settings.fetch_config())),
        )
    }

    /// Resolves a post link and downloads its video.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Lookup` when post details cannot be fetched and
    /// `RelayError::Fetch` when the download fails.
    pub async fn relay(&self, link: &str) -> Result<RelayOutcome, RelayError> {
        let details = self.lookup.fetch_post(link).await?;

        let Some(video_url) = resolver::best_video_url(&details) else {
            info!(link = %link, "No media URL in post details");
            return Ok(RelayOutcome::NoVideo);
        };
        drop(details);

        match self.downloader.download(&video_url).await? {
            Some(payload) => {
                info!(link = %link, bytes = payload.len(), "Video ready");
                Ok(RelayOutcome::Video(payload))
            }
            None => Ok(RelayOutcome::TooLarge { url: video_url }),
        }
    }
}
