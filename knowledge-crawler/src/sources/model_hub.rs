use crate::fetcher::Fetcher;
use crate::traits::{AdapterKind, CollectContext, SourceAdapter, SourceProfile};
use crate::transport::FetchRequest;
use crate::types::{CandidateRecord, CollectionWindow, CrawlerError, Result};
use crate::utils::time::parse_loose_datetime;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_PIPELINE_FILTER: &str = "text-generation";
pub const DEFAULT_MIN_DOWNLOADS: u64 = 100;
pub const DEFAULT_MIN_LIKES: u64 = 10;
pub const DEFAULT_MAX_MODELS: u32 = 100;

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(rename = "modelId")]
    model_id: Option<String>,
    id: Option<String>,
    author: Option<String>,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "lastModified")]
    last_modified: Option<String>,
}

/// Popularity gate: a model passes when it clears either threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityGate {
    pub min_downloads: u64,
    pub min_likes: u64,
}

impl PopularityGate {
    pub fn passes(&self, downloads: u64, likes: u64) -> bool {
        downloads >= self.min_downloads || likes >= self.min_likes
    }
}

impl Default for PopularityGate {
    fn default() -> Self {
        Self {
            min_downloads: DEFAULT_MIN_DOWNLOADS,
            min_likes: DEFAULT_MIN_LIKES,
        }
    }
}

/// Model hub listing API (Hugging Face), newest models first.
pub struct ModelHubSource {
    profile: SourceProfile,
    endpoint: Url,
    pipeline_filter: String,
    gate: PopularityGate,
    max_results: u32,
    fetcher: Fetcher,
}

impl ModelHubSource {
    pub fn new(
        profile: SourceProfile,
        endpoint: &str,
        pipeline_filter: impl Into<String>,
        gate: PopularityGate,
        max_results: u32,
        fetcher: Fetcher,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CrawlerError::invalid_source(&profile.name, format!("bad endpoint '{}': {}", endpoint, e)))?;

        Ok(Self {
            profile,
            endpoint,
            pipeline_filter: pipeline_filter.into(),
            gate,
            max_results: max_results.max(1),
            fetcher,
        })
    }

    pub fn listing_request(&self) -> FetchRequest {
        FetchRequest::get(self.endpoint.as_str())
            .with_query("sort", "createdAt")
            .with_query("direction", "-1")
            .with_query("limit", self.max_results)
            .with_query("filter", &self.pipeline_filter)
    }

    /// Maps a listing body; malformed or unpopular entries are skipped.
    pub fn parse_listing(&self, body: &str, window: &CollectionWindow) -> Result<Vec<CandidateRecord>> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(body)
            .map_err(|e| CrawlerError::ParseFailed(format!("model listing: {}", e)))?;

        let mut records = Vec::new();
        for value in entries {
            let model: ModelEntry = match serde_json::from_value(value) {
                Ok(model) => model,
                Err(e) => {
                    warn!("Error parsing model in {}: {}", self.profile.name, e);
                    continue;
                }
            };
            let Some(model_id) = model.model_id.clone().or_else(|| model.id.clone()) else {
                warn!("Model without id in {}", self.profile.name);
                continue;
            };

            let published_at = model
                .created_at
                .as_deref()
                .and_then(parse_loose_datetime)
                .or_else(|| model.last_modified.as_deref().and_then(parse_loose_datetime));
            if !window.admits(published_at) {
                continue;
            }
            if !self.gate.passes(model.downloads, model.likes) {
                debug!("[{}] Below popularity gate: {}", self.profile.name, model_id);
                continue;
            }

            let Ok(url) = self.endpoint.join(&format!("/{}", model_id)) else {
                warn!("Unusable model id in {}: {}", self.profile.name, model_id);
                continue;
            };
            let author = model
                .author
                .clone()
                .or_else(|| model_id.split_once('/').map(|(owner, _)| owner.to_string()));

            records.push(
                self.profile
                    .record(format!("New Model: {}", model_id), url.to_string())
                    .with_authors(author.into_iter().collect())
                    .with_published_at(published_at)
                    .with_raw_summary(Some(format!("Downloads: {}, Likes: {}", model.downloads, model.likes))),
            );
        }
        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for ModelHubSource {
    fn source_name(&self) -> String {
        self.profile.name.clone()
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::ModelHub
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Vec<CandidateRecord>> {
        info!("Crawling model hub: {}", self.profile.name);

        let response = self
            .fetcher
            .fetch(&self.listing_request())
            .await
            .map_err(|e| CrawlerError::unavailable(&self.profile.name, e))?;

        let records = self
            .parse_listing(&response.body, &ctx.window)
            .map_err(|e| CrawlerError::unavailable(&self.profile.name, e))?;

        info!("Collected {} models from {}", records.len(), self.profile.name);
        Ok(records)
    }
}
