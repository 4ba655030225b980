use crate::types::CandidateRecord;
use tracing::debug;

/// Case-insensitive stems; a match anywhere in title + summary is enough.
pub const DEFAULT_AI_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural",
    "neural network",
    "llm",
    "large language model",
    "gpt",
    "claude",
    "openai",
    "anthropic",
    "google ai",
    "deepmind",
    "chatbot",
    "generative ai",
    "foundation model",
    "transformer",
    "ai safety",
    "ai ethics",
    "ai regulation",
    "computer vision",
    "nlp",
    "natural language processing",
    "ai chip",
    "nvidia",
    "ai startup",
    "ai funding",
    "ai research",
    "robotics ai",
    "autonomous",
    "ai agent",
    "multimodal ai",
    "ai model",
    "ai training",
    "bert",
    "pytorch",
    "tensorflow",
    "huggingface",
    "stable diffusion",
];

/// Source tags that mark every item of a source as on-topic.
pub const DEFAULT_AI_TAGS: &[&str] = &[
    "ai",
    "ml",
    "artificial-intelligence",
    "machine-learning",
    "neural",
    "deep-learning",
];

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
    indicator_tags: Vec<String>,
}

impl RelevanceFilter {
    /// A filter over `keywords` only, with no indicator tags.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: normalize(keywords),
            indicator_tags: Vec::new(),
        }
    }

    pub fn with_indicator_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.indicator_tags = normalize(tags);
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_relevant(&self, title: &str, summary: &str) -> bool {
        let text = format!("{} {}", title, summary).to_lowercase();
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }

    /// Indicator tag on the record, or a keyword hit in its text.
    pub fn accepts(&self, record: &CandidateRecord) -> bool {
        let tagged = record
            .source_tags
            .iter()
            .any(|tag| self.indicator_tags.iter().any(|t| tag.eq_ignore_ascii_case(t)));

        let relevant = tagged
            || self.is_relevant(&record.title, record.raw_summary.as_deref().unwrap_or_default());
        debug!("AI relevance check: '{}' -> {}", truncate(&record.title, 40), relevant);
        relevant
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_AI_KEYWORDS).with_indicator_tags(DEFAULT_AI_TAGS)
    }
}

fn normalize<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
