use crate::fetcher::Fetcher;
use crate::parser::{FeedParser, ParsedEntry};
use crate::traits::{AdapterKind, CollectContext, SourceAdapter, SourceProfile};
use crate::transport::FetchRequest;
use crate::types::{CandidateRecord, CollectionWindow, CrawlerError, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Syndication feed source (RSS, Atom or JSON Feed).
pub struct FeedSource {
    profile: SourceProfile,
    endpoint: String,
    fetcher: Fetcher,
}

impl FeedSource {
    pub fn new(profile: SourceProfile, endpoint: impl Into<String>, fetcher: Fetcher) -> Self {
        Self {
            profile,
            endpoint: endpoint.into(),
            fetcher,
        }
    }

    fn to_record(&self, entry: ParsedEntry) -> CandidateRecord {
        let published_at = entry.best_timestamp();
        self.profile
            .record(entry.title, entry.url)
            .with_authors(entry.authors)
            .with_published_at(published_at)
            .with_raw_summary(entry.summary)
    }

    fn within_window(&self, entries: Vec<ParsedEntry>, window: &CollectionWindow) -> Vec<CandidateRecord> {
        entries
            .into_iter()
            .filter(|entry| {
                let keep = window.admits(entry.best_timestamp());
                if !keep {
                    debug!("[{}] Outside window: {}", self.profile.name, entry.title);
                }
                keep
            })
            .map(|entry| self.to_record(entry))
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for FeedSource {
    fn source_name(&self) -> String {
        self.profile.name.clone()
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Feed
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Vec<CandidateRecord>> {
        info!("Crawling feed: {}", self.profile.name);

        let response = self
            .fetcher
            .fetch(&FetchRequest::get(&self.endpoint))
            .await
            .map_err(|e| CrawlerError::unavailable(&self.profile.name, e))?;

        let parsed = FeedParser::parse_feed(&response.body)
            .map_err(|e| CrawlerError::unavailable(&self.profile.name, e))?;

        if parsed.skipped > 0 {
            warn!("[{}] Skipped {} entries without a title or link", self.profile.name, parsed.skipped);
        }
        let feed_title = parsed.title.unwrap_or_default();
        let records = self.within_window(parsed.entries, &ctx.window);
        info!(
            "Collected {} items from {} ({})",
            records.len(),
            self.profile.name,
            feed_title
        );
        Ok(records)
    }
}
