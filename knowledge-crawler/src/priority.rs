use crate::types::{CandidateRecord, Priority};
use chrono::{DateTime, Duration, Utc};

/// Source tags that force a record to HIGH regardless of age.
pub const DEFAULT_OVERRIDE_MARKERS: &[&str] = &["breakthrough", "funding"];

/// Maps an age to a tier. Buckets are lower-bound inclusive:
///
/// | age            | tier   |
/// |----------------|--------|
/// | `[0h, 24h)`    | MEDIUM |
/// | `[24h, 48h)`   | HIGH   |
/// | `[48h, 72h)`   | MEDIUM |
/// | `>= 72h`, negative or unknown | LOW |
pub fn tier_for_age(age: Option<Duration>) -> Priority {
    let Some(age) = age else {
        return Priority::Low;
    };

    if age < Duration::zero() {
        Priority::Low
    } else if age < Duration::hours(24) {
        Priority::Medium
    } else if age < Duration::hours(48) {
        Priority::High
    } else if age < Duration::hours(72) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

#[derive(Debug, Clone)]
pub struct PriorityClassifier {
    override_markers: Vec<String>,
}

impl PriorityClassifier {
    pub fn new<I, S>(override_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            override_markers: override_markers
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn override_markers(&self) -> &[String] {
        &self.override_markers
    }

    /// Age-only classification.
    pub fn classify(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Priority {
        tier_for_age(published_at.map(|at| now - at))
    }

    /// Age classification, then the marker override.
    pub fn classify_record(&self, record: &CandidateRecord, now: DateTime<Utc>) -> Priority {
        let by_age = self.classify(record.published_at, now);
        if self.override_markers.iter().any(|marker| record.has_tag(marker)) {
            return Priority::High;
        }
        by_age
    }
}

impl Default for PriorityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_OVERRIDE_MARKERS)
    }
}
