use crate::fetcher::Fetcher;
use crate::traits::{AdapterKind, CollectContext, SourceAdapter, SourceProfile};
use crate::transport::FetchRequest;
use crate::types::{CandidateRecord, CollectionWindow, CrawlerError, Result};
use crate::utils::{text, time};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_MAX_AUTHORS: usize = 3;

/// CSS selectors locating repeated item blocks on a page and the fields
/// inside each block. Field selectors are relative to the item block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
    pub date: Option<String>,
    pub summary: Option<String>,
    pub authors: Option<String>,
    pub max_authors: usize,
}

impl PageSelectors {
    pub fn new(item: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            title: title.into(),
            link: link.into(),
            date: None,
            summary: None,
            authors: None,
            max_authors: DEFAULT_MAX_AUTHORS,
        }
    }

    pub fn with_date(mut self, selector: impl Into<String>) -> Self {
        self.date = Some(selector.into());
        self
    }

    pub fn with_summary(mut self, selector: impl Into<String>) -> Self {
        self.summary = Some(selector.into());
        self
    }

    pub fn with_authors(mut self, selector: impl Into<String>, max_authors: usize) -> Self {
        self.authors = Some(selector.into());
        self.max_authors = max_authors;
        self
    }

    fn compile(&self, source_name: &str) -> Result<CompiledSelectors> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| {
                CrawlerError::invalid_source(source_name, format!("bad selector '{}': {:?}", css, e))
            })
        };
        let parse_opt = |css: &Option<String>| css.as_deref().map(parse).transpose();

        Ok(CompiledSelectors {
            item: parse(&self.item)?,
            title: parse(&self.title)?,
            link: parse(&self.link)?,
            date: parse_opt(&self.date)?,
            summary: parse_opt(&self.summary)?,
            authors: parse_opt(&self.authors)?,
        })
    }
}

struct CompiledSelectors {
    item: Selector,
    title: Selector,
    link: Selector,
    date: Option<Selector>,
    summary: Option<Selector>,
    authors: Option<Selector>,
}

/// Scrapes an HTML listing page that has no feed.
pub struct PageScrapeSource {
    profile: SourceProfile,
    base_url: Url,
    selectors: PageSelectors,
    fetcher: Fetcher,
}

impl PageScrapeSource {
    /// Fails with `ConfigurationInvalid` on an unparseable endpoint or selector.
    pub fn new(profile: SourceProfile, endpoint: &str, selectors: PageSelectors, fetcher: Fetcher) -> Result<Self> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| CrawlerError::invalid_source(&profile.name, format!("bad endpoint '{}': {}", endpoint, e)))?;
        selectors.compile(&profile.name)?;

        Ok(Self {
            profile,
            base_url,
            selectors,
            fetcher,
        })
    }

    /// Pulls candidate records out of a fetched page. A selector that
    /// matches nothing yields an empty list.
    pub fn extract_records(&self, body: &str, window: &CollectionWindow) -> Result<Vec<CandidateRecord>> {
        let compiled = self.selectors.compile(&self.profile.name)?;
        let document = Html::parse_document(body);

        let mut records = Vec::new();
        let mut matched = 0;
        for element in document.select(&compiled.item) {
            matched += 1;
            match self.extract_one(element, &compiled) {
                Ok(record) if window.admits(record.published_at) => records.push(record),
                Ok(record) => debug!("[{}] Outside window: {}", self.profile.name, record.title),
                Err(e) => warn!("Error parsing item element in {}: {}", self.profile.name, e),
            }
        }

        if matched == 0 {
            warn!(
                "[{}] Item selector '{}' matched nothing on {}",
                self.profile.name, self.selectors.item, self.base_url
            );
        }
        Ok(records)
    }

    fn extract_one(&self, element: ElementRef<'_>, compiled: &CompiledSelectors) -> Result<CandidateRecord> {
        let title = element
            .select(&compiled.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CrawlerError::ParseFailed("item has no title".to_string()))?;

        let href = element
            .select(&compiled.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .ok_or_else(|| CrawlerError::ParseFailed(format!("item '{}' has no link", title)))?;
        let url = crate::utils::url::resolve(&self.base_url, href)
            .ok_or_else(|| CrawlerError::ParseFailed(format!("item '{}' has unusable link '{}'", title, href)))?;

        let published_at = compiled
            .date
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .and_then(|date| {
                date.value()
                    .attr("datetime")
                    .and_then(time::parse_loose_datetime)
                    .or_else(|| time::parse_loose_datetime(&element_text(date)))
            });

        let summary = compiled
            .summary
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .map(element_text);

        let authors = compiled
            .authors
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .map(|el| {
                element_text(el)
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .take(self.selectors.max_authors)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(self
            .profile
            .record(title, url)
            .with_authors(authors)
            .with_published_at(published_at)
            .with_raw_summary(summary))
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    text::collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

#[async_trait]
impl SourceAdapter for PageScrapeSource {
    fn source_name(&self) -> String {
        self.profile.name.clone()
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::PageScrape
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Vec<CandidateRecord>> {
        info!("Scraping website: {}", self.profile.name);

        let response = self
            .fetcher
            .fetch(&FetchRequest::get(self.base_url.as_str()))
            .await
            .map_err(|e| CrawlerError::unavailable(&self.profile.name, e))?;

        let records = self.extract_records(&response.body, &ctx.window)?;
        info!("Scraped {} items from {}", records.len(), self.profile.name);
        Ok(records)
    }
}
