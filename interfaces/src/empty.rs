use async_trait::async_trait;

use crate::defs::{NormalizedRecord, Summarizer};

/// Leaves every summary empty.
pub struct EmptySummarizer;

#[async_trait]
impl Summarizer for EmptySummarizer {
    fn summarizer_name(&self) -> String {
        "empty".to_string()
    }

    async fn summarize(&self, record: &NormalizedRecord) -> anyhow::Result<Option<String>> {
        _ = record;
        Ok(None)
    }
}
