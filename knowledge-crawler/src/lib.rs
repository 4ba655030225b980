pub mod config;
pub mod fetcher;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod priority;
pub mod relevance;
pub mod sources;
pub mod traits;
pub mod transport;
pub mod types;
pub mod utils;

pub use config::{ConfigOrigin, CrawlerConfig, SourceDefinition, SourceKind};
pub use fetcher::{Fetcher, RateLimiter, RetryPolicy, RetryRun, RetryState};
pub use orchestrator::{CollectionOrchestrator, CrawlReport, OutcomeStatus, SourceOutcome};
pub use output::{CollectionStats, JsonSink, JsonlSink};
pub use parser::FeedParser;
pub use priority::PriorityClassifier;
pub use relevance::RelevanceFilter;
pub use sources::{build_adapter, build_registry};
pub use traits::{AdapterKind, CollectContext, SourceAdapter, SourceProfile};
pub use transport::{FetchRequest, HttpTransport, RawResponse, Transport, TransportError};
pub use types::*;
