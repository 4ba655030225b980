use crate::types::{CandidateRecord, CollectionWindow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tokio::time::Instant;

/// The fetch/parse strategy a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Feed,
    PageScrape,
    PaperIndex,
    CodeTrending,
    ModelHub,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Feed => "feed",
            AdapterKind::PageScrape => "page_scrape",
            AdapterKind::PaperIndex => "paper_index",
            AdapterKind::CodeTrending => "code_trending",
            AdapterKind::ModelHub => "model_hub",
        };
        f.write_str(name)
    }
}

/// Per-invocation inputs handed to [`SourceAdapter::collect`].
#[derive(Debug, Clone, Copy)]
pub struct CollectContext {
    pub window: CollectionWindow,
    /// Soft budget: adapters making several requests stop issuing new ones
    /// once it has passed and return what they have.
    pub deadline: Instant,
}

impl CollectContext {
    pub fn new(window: CollectionWindow, deadline: Instant) -> Self {
        Self { window, deadline }
    }

    pub fn deadline_passed(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Identity every record of a source is stamped with.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub name: String,
    pub tags: BTreeSet<String>,
}

impl SourceProfile {
    pub fn new<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// A fresh candidate carrying this source's name and tags.
    pub fn record(&self, title: impl Into<String>, url: impl Into<String>) -> CandidateRecord {
        CandidateRecord::new(title, url, self.name.clone()).with_tags(self.tags.iter().cloned())
    }
}

/// Fetches raw items from one external source and converts them to
/// candidate records.
///
/// Implementations route every request through their `Fetcher`, skip
/// individual malformed items, and only return items inside the window
/// (or with unknown publication time). An `Err` means the whole source
/// produced nothing usable this run.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_name(&self) -> String;

    fn kind(&self) -> AdapterKind;

    async fn collect(&self, ctx: &CollectContext) -> Result<Vec<CandidateRecord>>;
}
