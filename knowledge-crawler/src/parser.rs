use crate::types::{CrawlerError, Result};
use crate::utils::text;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use tracing::{debug, warn};

/// Summaries longer than this are cut.
pub const MAX_SUMMARY_CHARS: usize = 500;

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
    /// Entries dropped because they lacked a title or link.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ParsedEntry {
    /// Publication time, falling back to the last update.
    pub fn best_timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.updated_at)
    }
}

/// Parses RSS, Atom and JSON Feed documents.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| CrawlerError::ParseFailed(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let mut entries = Vec::with_capacity(feed.entries.len());
        let mut skipped = 0;

        for entry in feed.entries {
            match Self::parse_entry(entry) {
                Ok(parsed) => entries.push(parsed),
                Err(e) => {
                    warn!("Skipping feed entry: {}", e);
                    skipped += 1;
                }
            }
        }

        debug!("Parsed feed with {} entries ({} skipped)", entries.len(), skipped);
        Ok(ParsedFeed {
            title,
            entries,
            skipped,
        })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> Result<ParsedEntry> {
        let title = entry
            .title
            .map(|t| text::collapse_whitespace(&text::strip_html(&t.content)))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CrawlerError::ParseFailed(format!("entry {} has no title", entry.id)))?;

        let url = entry
            .links
            .first()
            .map(|link| link.href.trim().to_string())
            .filter(|href| !href.is_empty())
            .ok_or_else(|| CrawlerError::ParseFailed(format!("entry '{}' has no link", title)))?;

        // prefer the summary, fall back to the body
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|raw| text::truncate_chars(&text::strip_html(&raw), MAX_SUMMARY_CHARS))
            .filter(|s| !s.is_empty());

        let authors = entry
            .authors
            .into_iter()
            .map(|person| person.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Ok(ParsedEntry {
            url,
            title,
            summary,
            authors,
            published_at: entry.published,
            updated_at: entry.updated,
        })
    }
}
