use crate::fetcher::Fetcher;
use crate::parser::{FeedParser, ParsedFeed};
use crate::traits::{AdapterKind, CollectContext, SourceAdapter, SourceProfile};
use crate::transport::FetchRequest;
use crate::types::{CandidateRecord, CollectionWindow, CrawlerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub const DEFAULT_PAPER_CATEGORIES: &[&str] = &["cs.AI", "cs.LG", "cs.CL", "cs.CV", "cs.NE"];
pub const DEFAULT_MAX_PAPERS: u32 = 50;

/// Paper search API answering date-bounded category queries with Atom
/// (the arXiv export API).
pub struct PaperIndexSource {
    profile: SourceProfile,
    endpoint: String,
    categories: Vec<String>,
    max_results: u32,
    fetcher: Fetcher,
}

impl PaperIndexSource {
    pub fn new(
        profile: SourceProfile,
        endpoint: impl Into<String>,
        categories: Vec<String>,
        max_results: u32,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            profile,
            endpoint: endpoint.into(),
            categories,
            max_results: max_results.max(1),
            fetcher,
        }
    }

    pub fn query_for(&self, category: &str, window: &CollectionWindow) -> FetchRequest {
        let search = format!(
            "cat:{} AND submittedDate:[{} TO {}]",
            category,
            arxiv_timestamp(window.start),
            arxiv_timestamp(window.end)
        );
        FetchRequest::get(&self.endpoint)
            .with_query("search_query", search)
            .with_query("sortBy", "submittedDate")
            .with_query("sortOrder", "descending")
            .with_query("start", 0)
            .with_query("max_results", self.max_results)
    }

    fn papers_in(&self, parsed: ParsedFeed, category: &str, window: &CollectionWindow) -> Vec<CandidateRecord> {
        parsed
            .entries
            .into_iter()
            .filter(|entry| window.admits(entry.published_at))
            .map(|entry| {
                self.profile
                    .record(entry.title, entry.url)
                    .with_authors(entry.authors)
                    .with_published_at(entry.published_at)
                    .with_raw_summary(entry.summary)
                    .with_tags([category.to_string()])
            })
            .collect()
    }
}

fn arxiv_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M").to_string()
}

#[async_trait]
impl SourceAdapter for PaperIndexSource {
    fn source_name(&self) -> String {
        self.profile.name.clone()
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::PaperIndex
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Vec<CandidateRecord>> {
        info!("Crawling {} for AI/ML papers", self.profile.name);

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for category in &self.categories {
            if ctx.deadline_passed() {
                warn!("[{}] Budget exhausted before category {}", self.profile.name, category);
                break;
            }

            let request = self.query_for(category, &ctx.window);
            let parsed = match self.fetcher.fetch(&request).await {
                Ok(response) => FeedParser::parse_feed(&response.body),
                Err(e) => Err(e),
            };

            match parsed {
                Ok(parsed) => records.extend(self.papers_in(parsed, category, &ctx.window)),
                Err(e) => {
                    warn!("[{}] Category {} failed: {}", self.profile.name, category, e);
                    failures.push(e);
                }
            }
        }

        if !self.categories.is_empty() && failures.len() == self.categories.len() {
            let cause = failures.pop().map(|e| e.to_string()).unwrap_or_default();
            return Err(CrawlerError::unavailable(&self.profile.name, cause));
        }

        info!("Collected {} papers from {}", records.len(), self.profile.name);
        Ok(records)
    }
}
