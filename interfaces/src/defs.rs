use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Coarse urgency tier. Declaration order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single item as produced by a source adapter, before filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    pub raw_summary: Option<String>,
    pub source_name: String,
    pub source_tags: BTreeSet<String>,
}

impl CandidateRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            published_at: None,
            url: url.into(),
            raw_summary: None,
            source_name: source_name.into(),
            source_tags: BTreeSet::new(),
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn with_raw_summary(mut self, raw_summary: Option<String>) -> Self {
        self.raw_summary = raw_summary.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.source_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// A prioritized record emitted by one collection run.
///
/// `priority` and `collected_at` are fixed at construction; only `summary`
/// may be filled in afterwards by a [`Summarizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    pub raw_summary: Option<String>,
    pub source_name: String,
    pub source_tags: BTreeSet<String>,
    pub summary: String,
    priority: Priority,
    collected_at: DateTime<Utc>,
}

impl NormalizedRecord {
    pub fn new(candidate: CandidateRecord, priority: Priority, collected_at: DateTime<Utc>) -> Self {
        Self {
            title: candidate.title,
            authors: candidate.authors,
            published_at: candidate.published_at,
            url: candidate.url,
            raw_summary: candidate.raw_summary,
            source_name: candidate.source_name,
            source_tags: candidate.source_tags,
            summary: String::new(),
            priority,
            collected_at,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }
}

/// Source of "now". Injected so runs can be replayed deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Receives the final ordered record sequence and owns its serialization.
pub trait OutputSink {
    fn sink_name(&self) -> String;

    fn write(&mut self, records: &[NormalizedRecord]) -> anyhow::Result<()>;
}

/// Optionally fills `NormalizedRecord::summary` after a run.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn summarizer_name(&self) -> String;

    /// `Ok(None)` leaves the record's summary untouched.
    async fn summarize(&self, record: &NormalizedRecord) -> anyhow::Result<Option<String>>;
}

/// Consumes the final sequence, e.g. to update an external page.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn publisher_name(&self) -> String;

    async fn publish(&self, records: &[NormalizedRecord]) -> anyhow::Result<()>;
}

/// Outcome of [`summarize_all`]. Failed records keep an empty summary.
#[derive(Debug, Default)]
pub struct SummarizeReport {
    pub filled: usize,
    /// Url of each record whose summarizer call failed, with the error.
    pub failures: Vec<(String, anyhow::Error)>,
}

/// Runs `summarizer` over every record. One record failing does not stop
/// the others.
pub async fn summarize_all(summarizer: &dyn Summarizer, records: &mut [NormalizedRecord]) -> SummarizeReport {
    let mut report = SummarizeReport::default();
    for record in records.iter_mut() {
        match summarizer.summarize(record).await {
            Ok(Some(summary)) => {
                record.summary = summary;
                report.filled += 1;
            }
            Ok(None) => {}
            Err(e) => report.failures.push((record.url.clone(), e)),
        }
    }
    report
}
