pub mod code_trending;
pub mod model_hub;
pub mod page_scrape;
pub mod paper_index;
pub mod rss_feed;

pub use code_trending::CodeTrendingSource;
pub use model_hub::{ModelHubSource, PopularityGate};
pub use page_scrape::{PageScrapeSource, PageSelectors};
pub use paper_index::PaperIndexSource;
pub use rss_feed::FeedSource;

use crate::config::{CrawlerConfig, SourceDefinition, SourceKind};
use crate::fetcher::{Fetcher, RateLimiter, RetryPolicy};
use crate::traits::{SourceAdapter, SourceProfile};
use crate::transport::Transport;
use crate::types::{CrawlerError, FetchConfig, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Builds the adapter for one definition. Each adapter gets its own
/// fetcher, so throttling is per source.
pub fn build_adapter(
    definition: &SourceDefinition,
    fetch: &FetchConfig,
    transport: Arc<dyn Transport>,
) -> Result<Arc<dyn SourceAdapter>> {
    definition.validate()?;

    let profile = SourceProfile::new(&definition.name, definition.tags.iter().cloned());
    let fetcher = Fetcher::new(
        &definition.name,
        transport,
        RateLimiter::from_secs_f64(definition.throttle_delay_secs),
        RetryPolicy::from_config(definition.max_retries, fetch),
    );
    let endpoint = definition.endpoint.as_str();

    let adapter: Arc<dyn SourceAdapter> = match &definition.kind {
        SourceKind::Feed => Arc::new(FeedSource::new(profile, endpoint, fetcher)),
        SourceKind::PageScrape {
            item_selector,
            title_selector,
            link_selector,
            date_selector,
            summary_selector,
            authors_selector,
            max_authors,
        } => {
            let mut selectors = PageSelectors::new(item_selector, title_selector, link_selector);
            if let Some(date) = date_selector {
                selectors = selectors.with_date(date);
            }
            if let Some(summary) = summary_selector {
                selectors = selectors.with_summary(summary);
            }
            if let Some(authors) = authors_selector {
                selectors = selectors.with_authors(authors, *max_authors);
            }
            Arc::new(PageScrapeSource::new(profile, endpoint, selectors, fetcher)?)
        }
        SourceKind::PaperIndex {
            categories,
            max_results,
        } => Arc::new(PaperIndexSource::new(profile, endpoint, categories.clone(), *max_results, fetcher)),
        SourceKind::CodeTrending { topics, max_results } => {
            Arc::new(CodeTrendingSource::new(profile, endpoint, topics.clone(), *max_results, fetcher))
        }
        SourceKind::ModelHub {
            pipeline_filter,
            min_downloads,
            min_likes,
            max_results,
        } => {
            let gate = PopularityGate {
                min_downloads: *min_downloads,
                min_likes: *min_likes,
            };
            Arc::new(ModelHubSource::new(
                profile,
                endpoint,
                pipeline_filter.clone(),
                gate,
                *max_results,
                fetcher,
            )?)
        }
    };
    Ok(adapter)
}

/// Builds every valid source in `config`. Invalid definitions are logged
/// and skipped; an empty result is an error.
pub fn build_registry(config: &CrawlerConfig, transport: Arc<dyn Transport>) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut adapters = Vec::with_capacity(config.sources.len());

    for definition in &config.sources {
        match build_adapter(definition, &config.fetch, Arc::clone(&transport)) {
            Ok(adapter) => adapters.push(adapter),
            Err(e) => error!("Skipping source '{}': {}", definition.name, e),
        }
    }

    if adapters.is_empty() {
        return Err(CrawlerError::EmptyRegistry);
    }

    info!(
        "Registered {} of {} configured sources",
        adapters.len(),
        config.sources.len()
    );
    Ok(adapters)
}
