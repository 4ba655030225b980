use async_trait::async_trait;

use crate::defs::{NormalizedRecord, Summarizer};

/// Derives a summary from the record's raw summary: the leading sentences,
/// whitespace-collapsed and capped at `max_chars`.
pub struct BaselineSummarizer {
    max_sentences: usize,
    max_chars: usize,
}

impl BaselineSummarizer {
    pub fn new(max_sentences: usize, max_chars: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
            max_chars: max_chars.max(16),
        }
    }

    fn focus(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut end = collapsed.len();
        let mut sentences = 0;
        for (idx, c) in collapsed.char_indices() {
            if matches!(c, '.' | '!' | '?') {
                let next = collapsed[idx + c.len_utf8()..].chars().next();
                if next.map_or(true, char::is_whitespace) {
                    sentences += 1;
                    if sentences == self.max_sentences {
                        end = idx + c.len_utf8();
                        break;
                    }
                }
            }
        }
        let focused = &collapsed[..end];

        if focused.chars().count() <= self.max_chars {
            return focused.to_string();
        }
        let cut: String = focused.chars().take(self.max_chars - 3).collect();
        match cut.rfind(' ') {
            Some(space) => format!("{}...", &cut[..space]),
            None => format!("{}...", cut),
        }
    }
}

impl Default for BaselineSummarizer {
    fn default() -> Self {
        Self::new(2, 280)
    }
}

#[async_trait]
impl Summarizer for BaselineSummarizer {
    fn summarizer_name(&self) -> String {
        "baseline".to_string()
    }

    async fn summarize(&self, record: &NormalizedRecord) -> anyhow::Result<Option<String>> {
        let Some(raw) = record.raw_summary.as_deref() else {
            return Ok(None);
        };
        let focused = self.focus(raw);
        if focused.is_empty() {
            return Ok(None);
        }
        Ok(Some(focused))
    }
}
