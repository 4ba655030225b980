use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub use interfaces::defs::{CandidateRecord, Clock, FixedClock, NormalizedRecord, OutputSink, Priority, SystemClock};

/// Transport-level settings shared by every source's HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// First backoff interval; doubles per retry.
    pub retry_delay_ms: u64,
    /// Ceiling for a single backoff interval.
    pub max_retry_delay_ms: u64,
    pub max_response_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "AI-Knowledge-Crawler/1.0 (Research Purpose)".to_string(),
            timeout_seconds: 30,
            retry_delay_ms: 1_000,
            max_retry_delay_ms: 16_000,
            max_response_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Inclusive publication-time span a run is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CollectionWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days`-long span ending at `now`. A span reaching past the
    /// earliest representable time starts there instead.
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Unknown publication times are admitted; the caller decides what to do with them.
    pub fn admits(&self, published_at: Option<DateTime<Utc>>) -> bool {
        published_at.map_or(true, |at| self.contains(at))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("Fetch failed for {url}: {cause}")]
    FetchFailed { url: String, cause: String },

    #[error("Parse error: {0}")]
    ParseFailed(String),

    #[error("Source {source_name} unavailable: {cause}")]
    SourceUnavailable { source_name: String, cause: String },

    #[error("Invalid configuration for source {source_name}: {reason}")]
    ConfigurationInvalid { source_name: String, reason: String },

    #[error("No sources configured")]
    EmptyRegistry,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl CrawlerError {
    pub fn invalid_source(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CrawlerError::ConfigurationInvalid {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(source_name: impl Into<String>, cause: impl ToString) -> Self {
        CrawlerError::SourceUnavailable {
            source_name: source_name.into(),
            cause: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlerError>;
