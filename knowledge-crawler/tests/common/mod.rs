#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use knowledge_crawler::{
    AdapterKind, CandidateRecord, CollectContext, CollectionWindow, CrawlerError, FetchRequest, Fetcher,
    RateLimiter, RawResponse, RetryPolicy, SourceAdapter, Transport, TransportError,
};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration as StdDuration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

pub fn window() -> CollectionWindow {
    CollectionWindow::trailing_days(now(), 3)
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - Duration::hours(hours)
}

pub fn context() -> CollectContext {
    CollectContext::new(window(), tokio::time::Instant::now() + StdDuration::from_secs(120))
}

type Script = dyn Fn(&FetchRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync;

/// In-memory transport answering from a closure of (request, call index).
pub struct ScriptedTransport {
    script: Box<Script>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&FetchRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn body(body: &str) -> Arc<Self> {
        let body = body.to_string();
        Self::new(move |_, _| Ok(ok(&body)))
    }

    pub fn failing(err: TransportError) -> Arc<Self> {
        Self::new(move |_, _| Err(err.clone()))
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &FetchRequest) -> Result<RawResponse, TransportError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };
        (self.script)(request, index)
    }
}

pub fn ok(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        body: body.to_string(),
    }
}

/// No throttle, two quick retries.
pub fn quick_fetcher(name: &str, transport: Arc<ScriptedTransport>) -> Fetcher {
    Fetcher::new(
        name,
        transport,
        RateLimiter::new(StdDuration::ZERO),
        RetryPolicy::new(2, StdDuration::from_millis(10), StdDuration::from_millis(40)),
    )
}

pub enum Behaviour {
    Records(Vec<CandidateRecord>),
    Fail,
    Hang,
}

/// Adapter with canned behaviour for orchestrator tests.
pub struct StaticAdapter {
    pub name: String,
    pub behaviour: Behaviour,
}

impl StaticAdapter {
    pub fn records(name: &str, records: Vec<CandidateRecord>) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour: Behaviour::Records(records),
        })
    }

    pub fn failing(name: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour: Behaviour::Fail,
        })
    }

    pub fn hanging(name: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour: Behaviour::Hang,
        })
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Feed
    }

    async fn collect(&self, _ctx: &CollectContext) -> knowledge_crawler::Result<Vec<CandidateRecord>> {
        match &self.behaviour {
            Behaviour::Records(records) => Ok(records.clone()),
            Behaviour::Fail => Err(CrawlerError::unavailable(&self.name, "connection refused")),
            Behaviour::Hang => {
                tokio::time::sleep(StdDuration::from_secs(24 * 3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

pub fn candidate(title: &str, url: &str, source: &str, published_at: Option<DateTime<Utc>>) -> CandidateRecord {
    CandidateRecord::new(title, url, source).with_published_at(published_at)
}

pub const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Lab Blog</title>
    <link>https://lab.example.com</link>
    <description>Research updates</description>
    <item>
      <title>Scaling laws for multimodal models</title>
      <link>https://lab.example.com/posts/scaling</link>
      <description>&lt;p&gt;We study how &lt;b&gt;multimodal&lt;/b&gt; models scale.&lt;/p&gt;</description>
      <pubDate>Fri, 14 Jun 2024 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Old announcement</title>
      <link>https://lab.example.com/posts/old</link>
      <description>From last month.</description>
      <pubDate>Mon, 13 May 2024 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated note on tokenizers</title>
      <link>https://lab.example.com/posts/undated</link>
      <description>No date on this one.</description>
    </item>
    <item>
      <description>An item with neither title nor link.</description>
      <pubDate>Fri, 14 Jun 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

pub const ARXIV_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-06-15T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2406.01234v1</id>
    <updated>2024-06-14T17:59:59Z</updated>
    <published>2024-06-14T17:59:59Z</published>
    <title>Sparse Attention for Long Context Transformers</title>
    <summary>We propose a sparse attention scheme.</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2406.01234v1" rel="alternate" type="text/html"/>
  </entry>
</feed>"#;
