use crate::fetcher::Fetcher;
use crate::traits::{AdapterKind, CollectContext, SourceAdapter, SourceProfile};
use crate::transport::FetchRequest;
use crate::types::{CandidateRecord, CollectionWindow, CrawlerError, Result};
use crate::utils::time::parse_loose_datetime;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_TRENDING_TOPICS: &[&str] = &["machine-learning", "deep-learning", "llm"];
pub const DEFAULT_MAX_REPOSITORIES: u32 = 30;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    html_url: String,
    description: Option<String>,
    created_at: Option<String>,
    pushed_at: Option<String>,
    updated_at: Option<String>,
    owner: Option<Owner>,
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

impl Repository {
    /// Creation time when the repository is new within the window,
    /// otherwise the latest push, otherwise the last update.
    fn best_timestamp(&self, window: &CollectionWindow) -> Option<DateTime<Utc>> {
        let parse = |s: &Option<String>| s.as_deref().and_then(parse_loose_datetime);
        parse(&self.created_at)
            .filter(|created| window.contains(*created))
            .or_else(|| parse(&self.pushed_at))
            .or_else(|| parse(&self.updated_at))
    }
}

/// Repository listing API (GitHub search) queried per topic for
/// repositories active inside the window.
pub struct CodeTrendingSource {
    profile: SourceProfile,
    endpoint: String,
    topics: Vec<String>,
    max_results: u32,
    fetcher: Fetcher,
}

impl CodeTrendingSource {
    pub fn new(
        profile: SourceProfile,
        endpoint: impl Into<String>,
        topics: Vec<String>,
        max_results: u32,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            profile,
            endpoint: endpoint.into(),
            topics,
            max_results: max_results.clamp(1, 100),
            fetcher,
        }
    }

    pub fn query_for(&self, topic: &str, window: &CollectionWindow) -> FetchRequest {
        FetchRequest::get(&self.endpoint)
            .with_query("q", format!("topic:{} pushed:>={}", topic, window.start.format("%Y-%m-%d")))
            .with_query("sort", "stars")
            .with_query("order", "desc")
            .with_query("per_page", self.max_results)
            .with_header("Accept", "application/vnd.github+json")
    }

    /// Maps one search response body; malformed entries are skipped.
    pub fn parse_listing(&self, body: &str, topic: &str, window: &CollectionWindow) -> Result<Vec<CandidateRecord>> {
        let response: SearchResponse = serde_json::from_str(body)
            .map_err(|e| CrawlerError::ParseFailed(format!("search response: {}", e)))?;

        let mut records = Vec::new();
        for item in response.items {
            let repo: Repository = match serde_json::from_value(item) {
                Ok(repo) => repo,
                Err(e) => {
                    warn!("Error parsing repository in {}: {}", self.profile.name, e);
                    continue;
                }
            };

            let published_at = repo.best_timestamp(window);
            if !window.admits(published_at) {
                continue;
            }

            let summary = match repo.description.as_deref().map(str::trim) {
                Some(desc) if !desc.is_empty() => format!("{} ({} stars)", desc, repo.stargazers_count),
                _ => format!("{} stars", repo.stargazers_count),
            };

            records.push(
                self.profile
                    .record(format!("Trending: {}", repo.full_name), repo.html_url)
                    .with_authors(repo.owner.map(|o| vec![o.login]).unwrap_or_default())
                    .with_published_at(published_at)
                    .with_raw_summary(Some(summary))
                    .with_tags([topic.to_string()]),
            );
        }
        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for CodeTrendingSource {
    fn source_name(&self) -> String {
        self.profile.name.clone()
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::CodeTrending
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Vec<CandidateRecord>> {
        info!("Crawling trending AI/ML repositories: {}", self.profile.name);

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for topic in &self.topics {
            if ctx.deadline_passed() {
                warn!("[{}] Budget exhausted before topic {}", self.profile.name, topic);
                break;
            }

            let listing = match self.fetcher.fetch(&self.query_for(topic, &ctx.window)).await {
                Ok(response) => self.parse_listing(&response.body, topic, &ctx.window),
                Err(e) => Err(e),
            };

            match listing {
                Ok(found) => records.extend(found),
                Err(e) => {
                    warn!("[{}] Topic {} failed: {}", self.profile.name, topic, e);
                    failures.push(e);
                }
            }
        }

        if !self.topics.is_empty() && failures.len() == self.topics.len() {
            let cause = failures.pop().map(|e| e.to_string()).unwrap_or_default();
            return Err(CrawlerError::unavailable(&self.profile.name, cause));
        }

        info!("Collected {} trending repositories from {}", records.len(), self.profile.name);
        Ok(records)
    }
}
