use crate::priority::{PriorityClassifier, DEFAULT_OVERRIDE_MARKERS};
use crate::relevance::{RelevanceFilter, DEFAULT_AI_KEYWORDS, DEFAULT_AI_TAGS};
use crate::sources::code_trending::{DEFAULT_MAX_REPOSITORIES, DEFAULT_TRENDING_TOPICS};
use crate::sources::model_hub::{DEFAULT_MAX_MODELS, DEFAULT_MIN_DOWNLOADS, DEFAULT_MIN_LIKES, DEFAULT_PIPELINE_FILTER};
use crate::sources::page_scrape::DEFAULT_MAX_AUTHORS;
use crate::sources::paper_index::{DEFAULT_MAX_PAPERS, DEFAULT_PAPER_CATEGORIES};
use crate::traits::AdapterKind;
use crate::types::{CrawlerError, FetchConfig, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const CONFIG_ENV: &str = "CRAWLER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/sources.toml";

pub const DEFAULT_WINDOW_DAYS: u32 = 3;
pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 4;
pub const MAX_CONCURRENT_SOURCES_CAP: usize = 16;
pub const DEFAULT_SOURCE_BUDGET_SECS: u64 = 120;
pub const DEFAULT_THROTTLE_DELAY_SECS: f64 = 1.5;
pub const MAX_WINDOW_DAYS: u32 = 3650;
pub const MAX_SOURCE_BUDGET_SECS: u64 = 3600;
pub const MAX_THROTTLE_DELAY_SECS: f64 = 600.0;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// One configured source: identity, politeness settings and the payload
/// of its adapter variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_throttle_delay")]
    pub throttle_delay_secs: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    Feed,
    PageScrape {
        item_selector: String,
        title_selector: String,
        link_selector: String,
        #[serde(default)]
        date_selector: Option<String>,
        #[serde(default)]
        summary_selector: Option<String>,
        #[serde(default)]
        authors_selector: Option<String>,
        #[serde(default = "default_max_authors")]
        max_authors: usize,
    },
    PaperIndex {
        #[serde(default = "default_categories")]
        categories: Vec<String>,
        #[serde(default = "default_max_papers")]
        max_results: u32,
    },
    CodeTrending {
        #[serde(default = "default_topics")]
        topics: Vec<String>,
        #[serde(default = "default_max_repositories")]
        max_results: u32,
    },
    ModelHub {
        #[serde(default = "default_pipeline_filter")]
        pipeline_filter: String,
        #[serde(default = "default_min_downloads")]
        min_downloads: u64,
        #[serde(default = "default_min_likes")]
        min_likes: u64,
        #[serde(default = "default_max_models")]
        max_results: u32,
    },
}

fn default_throttle_delay() -> f64 {
    DEFAULT_THROTTLE_DELAY_SECS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_max_authors() -> usize {
    DEFAULT_MAX_AUTHORS
}
fn default_categories() -> Vec<String> {
    to_strings(DEFAULT_PAPER_CATEGORIES)
}
fn default_max_papers() -> u32 {
    DEFAULT_MAX_PAPERS
}
fn default_topics() -> Vec<String> {
    to_strings(DEFAULT_TRENDING_TOPICS)
}
fn default_max_repositories() -> u32 {
    DEFAULT_MAX_REPOSITORIES
}
fn default_pipeline_filter() -> String {
    DEFAULT_PIPELINE_FILTER.to_string()
}
fn default_min_downloads() -> u64 {
    DEFAULT_MIN_DOWNLOADS
}
fn default_min_likes() -> u64 {
    DEFAULT_MIN_LIKES
}
fn default_max_models() -> u32 {
    DEFAULT_MAX_MODELS
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SourceKind {
    pub fn adapter_kind(&self) -> AdapterKind {
        match self {
            SourceKind::Feed => AdapterKind::Feed,
            SourceKind::PageScrape { .. } => AdapterKind::PageScrape,
            SourceKind::PaperIndex { .. } => AdapterKind::PaperIndex,
            SourceKind::CodeTrending { .. } => AdapterKind::CodeTrending,
            SourceKind::ModelHub { .. } => AdapterKind::ModelHub,
        }
    }
}

impl SourceDefinition {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, tags: &[&str], kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            tags: to_strings(tags),
            throttle_delay_secs: DEFAULT_THROTTLE_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            kind,
        }
    }

    pub fn feed(name: impl Into<String>, endpoint: impl Into<String>, tags: &[&str]) -> Self {
        Self::new(name, endpoint, tags, SourceKind::Feed)
    }

    pub fn with_throttle(mut self, secs: f64) -> Self {
        self.throttle_delay_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Checks the fields deserialization cannot: presence, URL shape and
    /// variant payloads. Selector syntax is checked when the adapter is built.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(CrawlerError::invalid_source(&self.name, reason));

        if self.name.trim().is_empty() {
            return invalid("name is empty".to_string());
        }
        if self.endpoint.trim().is_empty() {
            return invalid("endpoint is missing".to_string());
        }
        if !crate::utils::url::is_http_url(&self.endpoint) {
            return invalid(format!("endpoint '{}' is not an http(s) URL", self.endpoint));
        }
        if !(0.0..=MAX_THROTTLE_DELAY_SECS).contains(&self.throttle_delay_secs) {
            return invalid(format!(
                "throttle_delay_secs {} is outside 0..={}",
                self.throttle_delay_secs, MAX_THROTTLE_DELAY_SECS
            ));
        }

        match &self.kind {
            SourceKind::Feed => {}
            SourceKind::PageScrape {
                item_selector,
                title_selector,
                link_selector,
                ..
            } => {
                for (field, value) in [
                    ("item_selector", item_selector),
                    ("title_selector", title_selector),
                    ("link_selector", link_selector),
                ] {
                    if value.trim().is_empty() {
                        return invalid(format!("{} is empty", field));
                    }
                }
            }
            SourceKind::PaperIndex { categories, .. } => {
                if categories.iter().all(|c| c.trim().is_empty()) {
                    return invalid("categories is empty".to_string());
                }
            }
            SourceKind::CodeTrending { topics, .. } => {
                if topics.iter().all(|t| t.trim().is_empty()) {
                    return invalid("topics is empty".to_string());
                }
            }
            SourceKind::ModelHub { pipeline_filter, .. } => {
                if pipeline_filter.trim().is_empty() {
                    return invalid("pipeline_filter is empty".to_string());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub keywords: Vec<String>,
    pub indicator_tags: Vec<String>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            keywords: to_strings(DEFAULT_AI_KEYWORDS),
            indicator_tags: to_strings(DEFAULT_AI_TAGS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub override_markers: Vec<String>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            override_markers: to_strings(DEFAULT_OVERRIDE_MARKERS),
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    BuiltIn,
}

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub window_days: u32,
    pub max_concurrent_sources: usize,
    pub source_budget_secs: u64,
    pub fetch: FetchConfig,
    pub relevance: RelevanceConfig,
    pub priority: PriorityConfig,
    pub sources: Vec<SourceDefinition>,
    /// Names of source entries that could not be read from the file.
    pub rejected_sources: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            source_budget_secs: DEFAULT_SOURCE_BUDGET_SECS,
            fetch: FetchConfig::default(),
            relevance: RelevanceConfig::default(),
            priority: PriorityConfig::default(),
            sources: default_sources(),
            rejected_sources: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawConfig {
    window_days: u32,
    max_concurrent_sources: usize,
    source_budget_secs: u64,
    fetch: FetchConfig,
    relevance: RelevanceConfig,
    priority: PriorityConfig,
    sources: Option<Vec<toml::Value>>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            source_budget_secs: DEFAULT_SOURCE_BUDGET_SECS,
            fetch: FetchConfig::default(),
            relevance: RelevanceConfig::default(),
            priority: PriorityConfig::default(),
            sources: None,
        }
    }
}

impl CrawlerConfig {
    /// Resolution order: `explicit`, then `$CRAWLER_CONFIG`, then
    /// `config/sources.toml`, then the built-in catalogue.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        if let Some(path) = explicit {
            return Ok((Self::load_from(path)?, ConfigOrigin::File(path.to_path_buf())));
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            let config = Self::load_from(&path)?;
            return Ok((config, ConfigOrigin::File(path)));
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            let config = Self::load_from(&default_path)?;
            return Ok((config, ConfigOrigin::File(default_path)));
        }

        info!("No configuration file found, using built-in source catalogue");
        Ok((Self::default(), ConfigOrigin::BuiltIn))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses a TOML document. A source entry that cannot be read is
    /// dropped and named in `rejected_sources`; the rest still load.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut config = Self {
            window_days: bounded("window_days", raw.window_days, 1, MAX_WINDOW_DAYS),
            max_concurrent_sources: raw.max_concurrent_sources,
            source_budget_secs: bounded("source_budget_secs", raw.source_budget_secs, 1, MAX_SOURCE_BUDGET_SECS),
            fetch: raw.fetch,
            relevance: raw.relevance,
            priority: raw.priority,
            sources: Vec::new(),
            rejected_sources: Vec::new(),
        };

        let Some(entries) = raw.sources else {
            config.sources = default_sources();
            return Ok(config);
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let name = entry
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("<source #{}>", index + 1));

            match entry.try_into::<SourceDefinition>() {
                Ok(definition) => config.sources.push(definition),
                Err(e) => {
                    let err = CrawlerError::invalid_source(&name, e.to_string());
                    error!("{}", err);
                    config.rejected_sources.push(name);
                }
            }
        }
        Ok(config)
    }

    /// Worker count: configured value bounded by the source count and the cap.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_sources
            .min(self.sources.len())
            .clamp(1, MAX_CONCURRENT_SOURCES_CAP)
    }

    pub fn relevance_filter(&self) -> RelevanceFilter {
        RelevanceFilter::new(&self.relevance.keywords).with_indicator_tags(&self.relevance.indicator_tags)
    }

    pub fn priority_classifier(&self) -> PriorityClassifier {
        PriorityClassifier::new(&self.priority.override_markers)
    }
}

fn bounded<T>(field: &str, value: T, min: T, max: T) -> T
where
    T: Ord + Copy + std::fmt::Display,
{
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{} = {} is outside {}..={}, using {}", field, value, min, max, clamped);
    }
    clamped
}

/// The built-in source catalogue.
pub fn default_sources() -> Vec<SourceDefinition> {
    let mut sources = Vec::new();

    // corporate AI labs
    for (name, url, tags) in [
        ("OpenAI Blog", "https://openai.com/blog/rss.xml", &["openai", "corporate", "research", "gpt", "llm"][..]),
        ("Anthropic News", "https://www.anthropic.com/news/rss.xml", &["anthropic", "corporate", "safety", "claude", "constitutional-ai"][..]),
        ("Google AI Blog", "https://ai.googleblog.com/feeds/posts/default", &["google", "corporate", "research", "deepmind", "bard"][..]),
        ("Meta AI", "https://ai.meta.com/blog/rss.xml", &["meta", "corporate", "research", "llama", "pytorch"][..]),
        ("Microsoft Research AI", "https://www.microsoft.com/en-us/research/feed/", &["microsoft", "corporate", "research", "azure", "copilot"][..]),
        ("Amazon Science", "https://www.amazon.science/index.rss", &["amazon", "corporate", "research", "alexa", "aws"][..]),
        ("Apple Machine Learning Research", "https://machinelearning.apple.com/rss.xml", &["apple", "corporate", "research", "mobile-ai", "privacy"][..]),
        ("NVIDIA AI Research", "https://developer.nvidia.com/blog/feed/", &["nvidia", "corporate", "hardware", "gpu", "cuda"][..]),
        ("IBM Research AI", "https://research.ibm.com/blog/rss.xml", &["ibm", "corporate", "research", "watson", "enterprise"][..]),
    ] {
        sources.push(SourceDefinition::feed(name, url, tags));
    }

    // startups
    for (name, url, tags) in [
        ("Cohere Blog", "https://txt.cohere.com/rss/", &["cohere", "startup", "llm", "embeddings", "enterprise"][..]),
        ("Hugging Face Blog", "https://huggingface.co/blog/feed.xml", &["huggingface", "startup", "open-source", "transformers", "datasets"][..]),
        ("Stability AI Blog", "https://stability.ai/blog/rss.xml", &["stability", "startup", "generative", "stable-diffusion", "image-ai"][..]),
    ] {
        sources.push(SourceDefinition::feed(name, url, tags).with_throttle(2.0));
    }

    sources.push(
        SourceDefinition::new(
            "arXiv AI/ML",
            "http://export.arxiv.org/api/query",
            &["arxiv", "research", "academic", "preprint"],
            SourceKind::PaperIndex {
                categories: to_strings(&["cs.AI", "cs.LG", "cs.CL", "cs.CV", "cs.NE", "cs.RO"]),
                max_results: DEFAULT_MAX_PAPERS,
            },
        )
        .with_throttle(1.0),
    );

    sources.push(
        SourceDefinition::new(
            "Hugging Face Model Hub",
            "https://huggingface.co/api/models",
            &["huggingface", "models", "implementation", "open-source"],
            SourceKind::ModelHub {
                pipeline_filter: default_pipeline_filter(),
                min_downloads: DEFAULT_MIN_DOWNLOADS,
                min_likes: DEFAULT_MIN_LIKES,
                max_results: DEFAULT_MAX_MODELS,
            },
        )
        .with_throttle(2.0),
    );

    sources.push(
        SourceDefinition::new(
            "GitHub Trending AI",
            "https://api.github.com/search/repositories",
            &["github", "trending", "repository", "open-source"],
            SourceKind::CodeTrending {
                topics: default_topics(),
                max_results: DEFAULT_MAX_REPOSITORIES,
            },
        )
        .with_throttle(2.0),
    );

    sources.push(
        SourceDefinition::new(
            "Papers with Code",
            "https://paperswithcode.com/latest",
            &["papers-with-code", "implementation", "benchmarks", "sota"],
            SourceKind::PageScrape {
                item_selector: ".infinite-item".to_string(),
                title_selector: ".paper-title a".to_string(),
                link_selector: ".paper-title a".to_string(),
                date_selector: Some(".item-date".to_string()),
                summary_selector: None,
                authors_selector: Some(".authors".to_string()),
                max_authors: DEFAULT_MAX_AUTHORS,
            },
        )
        .with_throttle(2.0),
    );

    // research institutes
    for (name, url, tags) in [
        ("Allen Institute for AI", "https://allenai.org/feed.xml", &["ai2", "research", "institute", "nlp", "computer-vision"][..]),
        ("MILA News", "https://mila.quebec/en/feed/", &["mila", "research", "institute", "deep-learning", "quebec"][..]),
        ("Stanford HAI", "https://hai.stanford.edu/news/feed", &["stanford", "research", "institute", "human-ai", "ethics"][..]),
        ("Berkeley AI Research", "https://bair.berkeley.edu/blog/feed.xml", &["berkeley", "research", "institute", "bair", "robotics"][..]),
        ("MIT CSAIL", "https://www.csail.mit.edu/rss.xml", &["mit", "research", "institute", "csail", "computer-science"][..]),
        ("Facebook AI Research (FAIR)", "https://ai.meta.com/blog/rss.xml", &["fair", "research", "institute", "facebook", "meta"][..]),
    ] {
        sources.push(SourceDefinition::feed(name, url, tags));
    }

    sources
}
