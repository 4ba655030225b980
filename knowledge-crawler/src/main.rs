use anyhow::Context;
use clap::Parser;
use interfaces::{summarize_all, BaselineSummarizer};
use knowledge_crawler::config::MAX_WINDOW_DAYS;
use knowledge_crawler::{
    build_registry, Clock, CollectionOrchestrator, CollectionStats, ConfigOrigin, CrawlerConfig, HttpTransport,
    JsonSink, JsonlSink, OutputSink, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "knowledge-crawler", about = "Collect and rank recent AI publications")]
struct Args {
    /// Source configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collection window in days; overrides the configuration
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_DAYS as i64))]
    days: Option<u32>,

    /// Write records as JSON lines
    #[arg(long)]
    jsonl: Option<PathBuf>,

    /// Write records as a single JSON document
    #[arg(long)]
    json: Option<PathBuf>,

    /// Fill summaries from the raw summary text
    #[arg(long)]
    summarize: bool,

    /// Records to list after the run
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let (config, origin) = CrawlerConfig::load(args.config.as_deref()).context("loading configuration")?;
    match &origin {
        ConfigOrigin::File(path) => info!("Configuration: {}", path.display()),
        ConfigOrigin::BuiltIn => info!("Configuration: built-in catalogue"),
    }
    if !config.rejected_sources.is_empty() {
        warn!("Rejected sources: {}", config.rejected_sources.join(", "));
    }

    let transport = Arc::new(HttpTransport::new(&config.fetch).context("building HTTP client")?);
    let adapters = build_registry(&config, transport).context("building source registry")?;

    let clock = Arc::new(SystemClock);
    let orchestrator = CollectionOrchestrator::from_config(&config, adapters).with_clock(clock.clone());
    info!("{} sources registered", orchestrator.source_count());
    let window_days = args.days.unwrap_or(config.window_days);

    let mut report = orchestrator.crawl(window_days).await?;

    if args.summarize {
        let summaries = summarize_all(&BaselineSummarizer::default(), &mut report.records).await;
        for (url, e) in &summaries.failures {
            warn!("Summary failed for {}: {:#}", url, e);
        }
        info!("Summarized {} of {} records", summaries.filled, report.records.len());
    }

    if let Some(path) = &args.jsonl {
        let mut sink = JsonlSink::create(path)?;
        sink.write(&report.records)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        let mut sink = JsonSink::create(path, clock.now())?.with_run_id(report.run_id);
        sink.write(&report.records)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let stats = CollectionStats::from_records(&report.records);
    println!("Run {}", report.run_id);
    println!("Window: {} .. {}", report.window.start, report.window.end);
    println!("Records: {} from {} sources", stats.total, stats.source_count);
    for (tier, count) in &stats.priority_breakdown {
        println!("  {:<6} {}", tier, count);
    }
    for outcome in report.failed_sources() {
        println!("  failed: {} ({:?})", outcome.source_name, outcome.status);
    }
    if !stats.top_tags.is_empty() {
        let tags: Vec<String> = stats.top_tags.iter().map(|(tag, n)| format!("{} ({})", tag, n)).collect();
        println!("Tags: {}", tags.join(", "));
    }

    for record in report.records.iter().take(args.top) {
        let date = record
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("[{}] {} | {} | {}", record.priority(), date, record.source_name, record.title);
    }

    Ok(())
}
