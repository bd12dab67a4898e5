//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the relay's tuning constants.

use crate::relay::fetcher::FetchConfig;
use crate::relay::lookup::LookupConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_bot_token: String,

    /// `ScrapeCreators` API key used for post lookups
    pub scrape_creators_api_key: Option<String>,

    /// Post detail endpoint of the lookup service
    #[serde(default = "default_post_detail_endpoint")]
    pub post_detail_endpoint: String,

    /// Largest video (in bytes) the bot will download and upload
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
}

fn default_post_detail_endpoint() -> String {
    DEFAULT_POST_DETAIL_ENDPOINT.to_string()
}

const fn default_max_video_bytes() -> u64 {
    MAX_VIDEO_BYTES
}

/// Builds the layered configuration source shared by all settings loaders.
///
/// # Errors
///
/// Returns a `ConfigError` if any source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Shouldn't be checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__MAX_VIDEO_BYTES=1 ./target/app` would set the `max_video_bytes` key
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables, empty values treated as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reel_relay::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;

        // Whitespace-only keys are as good as missing
        if settings
            .scrape_creators_api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            settings.scrape_creators_api_key = None;
        }

        Ok(settings)
    }

    /// Lookup client configuration derived from these settings
    #[must_use]
    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig::new(self.post_detail_endpoint.clone())
            .with_api_key(self.scrape_creators_api_key.clone())
    }

    /// Media fetcher configuration derived from these settings
    #[must_use]
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default().with_max_bytes(self.max_video_bytes)
    }
}

// Lookup service
/// Default post detail endpoint
pub const DEFAULT_POST_DETAIL_ENDPOINT: &str = "https://api.scrapecreators.com/v1/instagram/post";
/// Header carrying the lookup API key
pub const LOOKUP_API_KEY_HEADER: &str = "x-api-key";
/// Connect timeout for lookup requests
pub const LOOKUP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Read timeout for lookup requests; the service scrapes on demand and can be slow
pub const LOOKUP_READ_TIMEOUT: Duration = Duration::from_secs(40);

// Media download
/// Telegram rejects bot uploads above 50 MB, stay just under it
pub const MAX_VIDEO_BYTES: u64 = 49 * 1024 * 1024;
/// Size of a single read from the media stream
pub const FETCH_CHUNK_SIZE: usize = 128 * 1024;
/// Total download attempts, first one included
pub const FETCH_MAX_ATTEMPTS: u32 = 3;
/// Linear backoff step, the n-th retry waits `n * FETCH_BACKOFF_STEP`
pub const FETCH_BACKOFF_STEP: Duration = Duration::from_millis(1500);
/// Connect timeout for media downloads
pub const FETCH_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Read timeout for media downloads
pub const FETCH_READ_TIMEOUT: Duration = Duration::from_secs(180);
/// File name suggested for uploaded videos
pub const VIDEO_FILE_NAME: &str = "reel.mp4";

// Telegram API retries
/// Initial backoff for Telegram API retries (milliseconds)
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for a single Telegram API retry delay (milliseconds)
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Number of Telegram API retries after the first attempt
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
