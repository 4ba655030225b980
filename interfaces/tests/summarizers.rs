use chrono::{TimeZone, Utc};
use interfaces::{
    summarize_all, BaselineSummarizer, CandidateRecord, EmptySummarizer, NormalizedRecord,
    Priority, Summarizer,
};

fn record(raw_summary: Option<&str>) -> NormalizedRecord {
    let candidate = CandidateRecord::new("A new transformer", "https://example.com/a", "Test Feed")
        .with_raw_summary(raw_summary.map(str::to_string));
    NormalizedRecord::new(candidate, Priority::Medium, Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn baseline_keeps_leading_sentences() {
    let summarizer = BaselineSummarizer::new(2, 280);
    let rec = record(Some("First   sentence here. Second one! Third is dropped. Fourth too."));

    let summary = summarizer.summarize(&rec).await.unwrap();
    assert_eq!(summary.as_deref(), Some("First sentence here. Second one!"));
}

#[tokio::test]
async fn baseline_caps_long_text_on_a_word_boundary() {
    let summarizer = BaselineSummarizer::new(1, 20);
    let rec = record(Some("alpha beta gamma delta epsilon zeta eta theta"));

    let summary = summarizer.summarize(&rec).await.unwrap().unwrap();
    assert!(summary.ends_with("..."));
    assert!(summary.chars().count() <= 20);
    assert_eq!(summary, "alpha beta gamma...");
}

#[tokio::test]
async fn decimals_do_not_end_a_sentence() {
    let summarizer = BaselineSummarizer::new(1, 280);
    let rec = record(Some("Version 2.5 ships today. More later."));

    let summary = summarizer.summarize(&rec).await.unwrap();
    assert_eq!(summary.as_deref(), Some("Version 2.5 ships today."));
}

#[tokio::test]
async fn summarize_all_leaves_missing_raw_summaries_empty() {
    let mut records = vec![record(Some("Has text.")), record(None)];

    let report = summarize_all(&BaselineSummarizer::default(), &mut records).await;
    assert_eq!(report.filled, 1);
    assert!(report.failures.is_empty());
    assert_eq!(records[0].summary, "Has text.");
    assert!(records[1].summary.is_empty());

    let report = summarize_all(&EmptySummarizer, &mut records).await;
    assert_eq!(report.filled, 0);
    assert_eq!(records[0].priority(), Priority::Medium);
}

#[test]
fn priority_orders_high_first() {
    let mut tiers = vec![Priority::Low, Priority::High, Priority::Medium];
    tiers.sort();
    assert_eq!(tiers, Priority::ALL.to_vec());
    assert_eq!(Priority::High.to_string(), "high");
}

#[test]
fn blank_raw_summary_is_treated_as_absent() {
    let candidate = CandidateRecord::new("t", "u", "s").with_raw_summary(Some("   ".to_string()));
    assert!(candidate.raw_summary.is_none());
}

struct FlakySummarizer;

#[async_trait::async_trait]
impl Summarizer for FlakySummarizer {
    fn summarizer_name(&self) -> String {
        "flaky".to_string()
    }

    async fn summarize(&self, record: &NormalizedRecord) -> anyhow::Result<Option<String>> {
        match record.raw_summary.as_deref() {
            Some(text) => Ok(Some(text.to_uppercase())),
            None => Err(anyhow::anyhow!("upstream returned 500")),
        }
    }
}

#[tokio::test]
async fn summarize_all_reports_failures() {
    let mut records = vec![record(None), record(Some("ok."))];

    let report = summarize_all(&FlakySummarizer, &mut records).await;

    assert_eq!(report.filled, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "https://example.com/a");
    assert!(report.failures[0].1.to_string().contains("500"));
    assert!(records[0].summary.is_empty());
    assert_eq!(records[1].summary, "OK.");
}
