use crate::config::CrawlerConfig;
use crate::priority::PriorityClassifier;
use crate::relevance::RelevanceFilter;
use crate::traits::{AdapterKind, CollectContext, SourceAdapter};
use crate::types::{CandidateRecord, Clock, CollectionWindow, CrawlerError, NormalizedRecord, Result, SystemClock};
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Extra time a source gets past its soft deadline before it is cut off.
pub const SOURCE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Collected { count: usize },
    Failed { cause: String },
    TimedOut,
}

/// What one source contributed to a run.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source_name: String,
    pub kind: AdapterKind,
    pub status: OutcomeStatus,
    pub elapsed: Duration,
}

impl SourceOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Collected { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub window: CollectionWindow,
    pub records: Vec<NormalizedRecord>,
    pub outcomes: Vec<SourceOutcome>,
}

impl CrawlReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

pub struct CollectionOrchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    filter: RelevanceFilter,
    classifier: PriorityClassifier,
    clock: Arc<dyn Clock>,
    max_concurrency: usize,
    source_budget: Duration,
}

impl CollectionOrchestrator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            filter: RelevanceFilter::default(),
            classifier: PriorityClassifier::default(),
            clock: Arc::new(SystemClock),
            max_concurrency: crate::config::DEFAULT_MAX_CONCURRENT_SOURCES,
            source_budget: Duration::from_secs(crate::config::DEFAULT_SOURCE_BUDGET_SECS),
        }
    }

    pub fn from_config(config: &CrawlerConfig, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self::new(adapters)
            .with_filter(config.relevance_filter())
            .with_classifier(config.priority_classifier())
            .with_max_concurrency(config.effective_concurrency())
            .with_source_budget(Duration::from_secs(config.source_budget_secs))
    }

    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_classifier(mut self, classifier: PriorityClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, crate::config::MAX_CONCURRENT_SOURCES_CAP);
        self
    }

    /// Capped at `MAX_SOURCE_BUDGET_SECS`.
    pub fn with_source_budget(mut self, budget: Duration) -> Self {
        self.source_budget = budget.min(Duration::from_secs(crate::config::MAX_SOURCE_BUDGET_SECS));
        self
    }

    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Runs every source over the trailing `window_days` and returns the
    /// merged, deduplicated and ordered records.
    pub async fn crawl_all(&self, window_days: u32) -> Result<Vec<NormalizedRecord>> {
        Ok(self.crawl(window_days).await?.records)
    }

    pub async fn crawl(&self, window_days: u32) -> Result<CrawlReport> {
        if self.adapters.is_empty() {
            return Err(CrawlerError::EmptyRegistry);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("crawl", %run_id);
        self.run(run_id, window_days).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, window_days: u32) -> Result<CrawlReport> {
        let window = CollectionWindow::trailing_days(self.clock.now(), window_days);
        let concurrency = self.max_concurrency.min(self.adapters.len()).max(1);
        info!(
            "Crawling {} sources from {} to {} ({} at a time)",
            self.adapters.len(),
            window.start,
            window.end,
            concurrency
        );

        let budget = self.source_budget;
        let tasks: Vec<_> = self
            .adapters
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, adapter)| run_source(index, adapter, window, budget))
            .collect();

        let mut results: Vec<(usize, SourceOutcome, Vec<CandidateRecord>)> =
            stream::iter(tasks).buffer_unordered(concurrency).collect().await;

        // merge in registry order so dedup ties resolve the same way every run
        results.sort_by_key(|(index, _, _)| *index);

        let mut outcomes = Vec::with_capacity(results.len());
        let mut candidates = Vec::new();
        for (_, outcome, records) in results {
            outcomes.push(outcome);
            candidates.extend(records);
        }

        let collected = candidates.len();
        candidates.retain(|candidate| self.filter.accepts(candidate));
        let relevant = candidates.len();

        let unique = dedupe_by_url(candidates);
        let emitted_at = self.clock.now();
        let mut records: Vec<NormalizedRecord> = unique
            .into_iter()
            .map(|candidate| {
                let priority = self.classifier.classify_record(&candidate, window.end);
                NormalizedRecord::new(candidate, priority, emitted_at)
            })
            .collect();
        sort_records(&mut records);

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        info!(
            "Crawl finished: {} collected, {} relevant, {} unique; {}/{} sources failed",
            collected,
            relevant,
            records.len(),
            failed,
            outcomes.len()
        );

        Ok(CrawlReport {
            run_id,
            window,
            records,
            outcomes,
        })
    }
}

async fn run_source(
    index: usize,
    adapter: Arc<dyn SourceAdapter>,
    window: CollectionWindow,
    budget: Duration,
) -> (usize, SourceOutcome, Vec<CandidateRecord>) {
    let source_name = adapter.source_name();
    let kind = adapter.kind();
    let started = Instant::now();
    let ctx = CollectContext::new(window, started + budget);

    info!("Collecting from {} ({})", source_name, kind);
    let task = tokio::spawn(
        async move { timeout(budget.saturating_add(SOURCE_GRACE), adapter.collect(&ctx)).await }.in_current_span(),
    );

    let (status, records) = match task.await {
        Ok(Ok(Ok(records))) => {
            info!("{}: {} items in window", source_name, records.len());
            (OutcomeStatus::Collected { count: records.len() }, records)
        }
        Ok(Ok(Err(e))) => {
            error!("Source {} failed: {}", source_name, e);
            (OutcomeStatus::Failed { cause: e.to_string() }, Vec::new())
        }
        Ok(Err(_)) => {
            error!("Source {} exceeded its {:?} budget", source_name, budget);
            (OutcomeStatus::TimedOut, Vec::new())
        }
        Err(e) => {
            error!("Source {} task aborted: {}", source_name, e);
            (OutcomeStatus::Failed { cause: e.to_string() }, Vec::new())
        }
    };

    let outcome = SourceOutcome {
        source_name,
        kind,
        status,
        elapsed: started.elapsed(),
    };
    (index, outcome, records)
}

/// Keeps one record per url, in first-seen order. A later duplicate that
/// has a publish time replaces a kept record that lacks one.
pub fn dedupe_by_url(candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CandidateRecord> = Vec::with_capacity(candidates.len());
    let mut duplicates = 0usize;

    for candidate in candidates {
        match positions.get(&candidate.url) {
            Some(&pos) => {
                duplicates += 1;
                if unique[pos].published_at.is_none() && candidate.published_at.is_some() {
                    debug!("Replacing undated duplicate of {}", candidate.url);
                    unique[pos] = candidate;
                }
            }
            None => {
                positions.insert(candidate.url.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }

    if duplicates > 0 {
        debug!("Dropped {} duplicate urls", duplicates);
    }
    unique
}

/// Priority tier first, then newest first; undated records last in their tier.
pub fn sort_records(records: &mut [NormalizedRecord]) {
    records.sort_by(|a, b| {
        a.priority().cmp(&b.priority()).then_with(|| match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
}
