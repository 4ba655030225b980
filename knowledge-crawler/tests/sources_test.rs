mod common;

use common::{context, init_tracing, ok, quick_fetcher, window, ScriptedTransport, ARXIV_FIXTURE, RSS_FIXTURE};
use knowledge_crawler::sources::{
    CodeTrendingSource, FeedSource, ModelHubSource, PageScrapeSource, PageSelectors, PaperIndexSource, PopularityGate,
};
use knowledge_crawler::{
    build_adapter, AdapterKind, CollectContext, CrawlerError, FetchConfig, SourceAdapter, SourceDefinition, SourceKind,
    SourceProfile, TransportError,
};

fn profile(name: &str, tags: &[&str]) -> SourceProfile {
    SourceProfile::new(name, tags.iter().map(|t| t.to_string()))
}

#[tokio::test]
async fn test_feed_source_collects_items_in_window() -> knowledge_crawler::Result<()> {
    init_tracing();

    let transport = ScriptedTransport::body(RSS_FIXTURE);
    let source = FeedSource::new(
        profile("Lab Blog", &["research"]),
        "https://lab.example.com/rss.xml",
        quick_fetcher("Lab Blog", transport.clone()),
    );

    let records = source.collect(&context()).await?;

    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Scaling laws for multimodal models", "Undated note on tokenizers"]);

    let first = &records[0];
    assert_eq!(first.url, "https://lab.example.com/posts/scaling");
    assert_eq!(first.source_name, "Lab Blog");
    assert!(first.has_tag("research"));
    assert_eq!(first.raw_summary.as_deref(), Some("We study how multimodal models scale."));
    assert!(records[1].published_at.is_none());
    assert_eq!(transport.calls()[0].url, "https://lab.example.com/rss.xml");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_feed_source_unavailable_when_fetch_fails() {
    let transport = ScriptedTransport::failing(TransportError::Status { status: 502 });
    let source = FeedSource::new(
        profile("Broken", &[]),
        "https://broken.example.com/rss",
        quick_fetcher("Broken", transport),
    );

    match source.collect(&context()).await {
        Err(CrawlerError::SourceUnavailable { source_name, .. }) => assert_eq!(source_name, "Broken"),
        other => panic!("expected SourceUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_feed_source_rejects_non_feed_body() {
    let transport = ScriptedTransport::body("<html><body>Not a feed</body></html>");
    let source = FeedSource::new(profile("Html", &[]), "https://html.example.com/", quick_fetcher("Html", transport));

    assert!(source.collect(&context()).await.is_err());
}

const PAGE_FIXTURE: &str = r#"
<html><body>
  <div class="infinite-item">
    <h1 class="paper-title"><a href="/paper/sparse-moe">Sparse Mixture of Experts at Scale</a></h1>
    <span class="item-date">Jun 14, 2024</span>
    <p class="authors">Ada Lovelace, Alan Turing, Grace Hopper, Edsger Dijkstra</p>
    <p class="abstract">  Routing tokens   to experts. </p>
  </div>
  <div class="infinite-item">
    <h1 class="paper-title"><a href="https://other.example.org/p/2">Diffusion Without Noise</a></h1>
    <time class="item-date" datetime="2024-06-13T08:30:00Z">yesterday-ish</time>
  </div>
  <div class="infinite-item">
    <h1 class="paper-title"><a href="/paper/old">An Old Paper</a></h1>
    <span class="item-date">2023-01-02</span>
  </div>
  <div class="infinite-item">
    <span class="item-date">Jun 14, 2024</span>
  </div>
</body></html>
"#;

fn page_source(transport: std::sync::Arc<ScriptedTransport>) -> PageScrapeSource {
    let selectors = PageSelectors::new(".infinite-item", ".paper-title a", ".paper-title a")
        .with_date(".item-date")
        .with_summary(".abstract")
        .with_authors(".authors", 3);
    PageScrapeSource::new(
        profile("Papers with Code", &["implementation"]),
        "https://papers.example.com/latest",
        selectors,
        quick_fetcher("Papers with Code", transport),
    )
    .unwrap()
}

#[test]
fn test_page_scrape_extracts_items() -> knowledge_crawler::Result<()> {
    let source = page_source(ScriptedTransport::body(""));

    let records = source.extract_records(PAGE_FIXTURE, &window())?;

    assert_eq!(records.len(), 2);
    let first = &records[0];
    assert_eq!(first.title, "Sparse Mixture of Experts at Scale");
    assert_eq!(first.url, "https://papers.example.com/paper/sparse-moe");
    assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing", "Grace Hopper"]);
    assert_eq!(first.raw_summary.as_deref(), Some("Routing tokens to experts."));
    assert_eq!(first.published_at.map(|d| d.to_rfc3339()), Some("2024-06-14T00:00:00+00:00".to_string()));

    let second = &records[1];
    assert_eq!(second.url, "https://other.example.org/p/2");
    assert_eq!(second.published_at.map(|d| d.to_rfc3339()), Some("2024-06-13T08:30:00+00:00".to_string()));
    assert!(second.authors.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_page_scrape_selector_miss_returns_empty() -> knowledge_crawler::Result<()> {
    let source = page_source(ScriptedTransport::body("<html><body><p>Redesigned page</p></body></html>"));

    let records = source.collect(&context()).await?;

    assert!(records.is_empty());
    Ok(())
}

#[test]
fn test_page_scrape_invalid_selector_is_configuration_error() {
    let result = PageScrapeSource::new(
        profile("Bad", &[]),
        "https://bad.example.com/",
        PageSelectors::new("div[[", "a", "a"),
        quick_fetcher("Bad", ScriptedTransport::body("")),
    );

    assert!(matches!(result, Err(CrawlerError::ConfigurationInvalid { .. })));
}

#[tokio::test]
async fn test_paper_index_queries_each_category() -> knowledge_crawler::Result<()> {
    init_tracing();

    let transport = ScriptedTransport::body(ARXIV_FIXTURE);
    let source = PaperIndexSource::new(
        profile("arXiv", &["arxiv", "research"]),
        "http://export.arxiv.org/api/query",
        vec!["cs.AI".to_string(), "cs.LG".to_string()],
        25,
        quick_fetcher("arXiv", transport.clone()),
    );

    let records = source.collect(&context()).await?;

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].query_value("search_query"),
        Some("cat:cs.AI AND submittedDate:[202406121200 TO 202406151200]")
    );
    assert_eq!(calls[1].query_value("max_results"), Some("25"));
    assert_eq!(calls[1].query_value("sortOrder"), Some("descending"));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Sparse Attention for Long Context Transformers");
    assert_eq!(records[0].authors, vec!["Ada Lovelace", "Alan Turing"]);
    assert!(records[0].has_tag("cs.AI"));
    assert!(records[1].has_tag("cs.LG"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paper_index_tolerates_one_failing_category() -> knowledge_crawler::Result<()> {
    let transport = ScriptedTransport::new(|request, _| {
        if request.query_value("search_query").is_some_and(|q| q.contains("cs.CV")) {
            Err(TransportError::Status { status: 500 })
        } else {
            Ok(ok(ARXIV_FIXTURE))
        }
    });
    let source = PaperIndexSource::new(
        profile("arXiv", &[]),
        "http://export.arxiv.org/api/query",
        vec!["cs.CV".to_string(), "cs.CL".to_string()],
        10,
        quick_fetcher("arXiv", transport),
    );

    let records = source.collect(&context()).await?;

    assert_eq!(records.len(), 1);
    assert!(records[0].has_tag("cs.CL"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paper_index_stops_at_deadline() -> knowledge_crawler::Result<()> {
    let transport = ScriptedTransport::body(ARXIV_FIXTURE);
    let source = PaperIndexSource::new(
        profile("arXiv", &[]),
        "http://export.arxiv.org/api/query",
        vec!["cs.AI".to_string(), "cs.LG".to_string()],
        10,
        quick_fetcher("arXiv", transport.clone()),
    );
    let expired = CollectContext::new(window(), tokio::time::Instant::now());

    let records = source.collect(&expired).await?;

    assert!(records.is_empty());
    assert_eq!(transport.call_count(), 0);
    Ok(())
}

const GITHUB_FIXTURE: &str = r#"{
  "total_count": 3,
  "items": [
    {
      "full_name": "acme/tiny-llm",
      "html_url": "https://github.com/acme/tiny-llm",
      "description": "A tiny LLM trainer",
      "created_at": "2024-06-14T08:00:00Z",
      "pushed_at": "2024-06-15T09:00:00Z",
      "updated_at": "2024-06-15T09:00:00Z",
      "owner": { "login": "acme" },
      "stargazers_count": 420
    },
    {
      "full_name": "old/classic-ml",
      "html_url": "https://github.com/old/classic-ml",
      "description": null,
      "created_at": "2019-01-01T00:00:00Z",
      "pushed_at": "2024-06-13T10:00:00Z",
      "owner": { "login": "old" },
      "stargazers_count": 9000
    },
    { "full_name": 17 }
  ]
}"#;

#[test]
fn test_code_trending_parses_listing() -> knowledge_crawler::Result<()> {
    let source = CodeTrendingSource::new(
        profile("GitHub", &["github"]),
        "https://api.github.com/search/repositories",
        vec!["llm".to_string()],
        30,
        quick_fetcher("GitHub", ScriptedTransport::body("")),
    );

    let records = source.parse_listing(GITHUB_FIXTURE, "llm", &window())?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Trending: acme/tiny-llm");
    assert_eq!(records[0].authors, vec!["acme"]);
    assert_eq!(records[0].raw_summary.as_deref(), Some("A tiny LLM trainer (420 stars)"));
    assert_eq!(
        records[0].published_at.map(|d| d.to_rfc3339()),
        Some("2024-06-14T08:00:00+00:00".to_string())
    );
    assert!(records[0].has_tag("llm"));

    // created long ago, so the push time stands in
    assert_eq!(
        records[1].published_at.map(|d| d.to_rfc3339()),
        Some("2024-06-13T10:00:00+00:00".to_string())
    );
    assert_eq!(records[1].raw_summary.as_deref(), Some("9000 stars"));
    Ok(())
}

#[tokio::test]
async fn test_code_trending_query_shape() -> knowledge_crawler::Result<()> {
    let transport = ScriptedTransport::body(r#"{"items": []}"#);
    let source = CodeTrendingSource::new(
        profile("GitHub", &[]),
        "https://api.github.com/search/repositories",
        vec!["machine-learning".to_string()],
        500,
        quick_fetcher("GitHub", transport.clone()),
    );

    source.collect(&context()).await?;

    let call = &transport.calls()[0];
    assert_eq!(call.query_value("q"), Some("topic:machine-learning pushed:>=2024-06-12"));
    assert_eq!(call.query_value("per_page"), Some("100"));
    assert_eq!(call.query_value("sort"), Some("stars"));
    Ok(())
}

const HUB_FIXTURE: &str = r#"[
  { "modelId": "acme/chat-7b", "downloads": 1500, "likes": 2, "createdAt": "2024-06-14T10:00:00.000Z" },
  { "id": "solo-model", "author": "someone", "downloads": 3, "likes": 40, "lastModified": "2024-06-13T10:00:00.000Z" },
  { "modelId": "quiet/unpopular", "downloads": 5, "likes": 1, "createdAt": "2024-06-14T10:00:00.000Z" },
  { "modelId": "acme/ancient", "downloads": 99999, "likes": 999, "createdAt": "2021-01-01T00:00:00.000Z" },
  { "downloads": 1000 }
]"#;

#[test]
fn test_model_hub_applies_popularity_gate() -> knowledge_crawler::Result<()> {
    let source = ModelHubSource::new(
        profile("Hub", &["models"]),
        "https://huggingface.co/api/models",
        "text-generation",
        PopularityGate::default(),
        50,
        quick_fetcher("Hub", ScriptedTransport::body("")),
    )?;

    let records = source.parse_listing(HUB_FIXTURE, &window())?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "New Model: acme/chat-7b");
    assert_eq!(records[0].url, "https://huggingface.co/acme/chat-7b");
    assert_eq!(records[0].authors, vec!["acme"]);
    assert_eq!(records[0].raw_summary.as_deref(), Some("Downloads: 1500, Likes: 2"));
    assert_eq!(records[1].title, "New Model: solo-model");
    assert_eq!(records[1].authors, vec!["someone"]);

    let request = source.listing_request();
    assert_eq!(request.query_value("filter"), Some("text-generation"));
    assert_eq!(request.query_value("sort"), Some("createdAt"));
    Ok(())
}

#[test]
fn test_build_adapter_per_kind() -> knowledge_crawler::Result<()> {
    let transport = ScriptedTransport::body("");
    let fetch = FetchConfig::default();

    let feed = build_adapter(
        &SourceDefinition::feed("Blog", "https://blog.example.com/rss", &["ai"]),
        &fetch,
        transport.clone(),
    )?;
    assert_eq!(feed.kind(), AdapterKind::Feed);
    assert_eq!(feed.source_name(), "Blog");

    let hub = build_adapter(
        &SourceDefinition::new(
            "Hub",
            "https://huggingface.co/api/models",
            &[],
            SourceKind::ModelHub {
                pipeline_filter: "text-generation".to_string(),
                min_downloads: 1,
                min_likes: 1,
                max_results: 5,
            },
        ),
        &fetch,
        transport.clone(),
    )?;
    assert_eq!(hub.kind(), AdapterKind::ModelHub);

    let missing_endpoint = build_adapter(&SourceDefinition::feed("Nowhere", "", &[]), &fetch, transport);
    assert!(matches!(missing_endpoint, Err(CrawlerError::ConfigurationInvalid { .. })));
    Ok(())
}
