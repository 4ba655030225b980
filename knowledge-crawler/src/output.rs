use crate::types::{NormalizedRecord, OutputSink, Priority};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const TOP_SOURCES: usize = 10;
pub const TOP_TAGS: usize = 15;

/// Newline-delimited JSON, one record per line.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlSink<BufWriter<File>> {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> OutputSink for JsonlSink<W> {
    fn sink_name(&self) -> String {
        "jsonl".to_string()
    }

    fn write(&mut self, records: &[NormalizedRecord]) -> anyhow::Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        info!("Wrote {} records as JSON lines", records.len());
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    run_id: Option<Uuid>,
    generated_at: DateTime<Utc>,
    total_count: usize,
    sources: Vec<&'a str>,
    priority_breakdown: BTreeMap<&'static str, usize>,
    records: &'a [NormalizedRecord],
}

/// A single pretty-printed JSON document wrapping the records with run metadata.
pub struct JsonSink<W: Write> {
    writer: W,
    run_id: Option<Uuid>,
    generated_at: DateTime<Utc>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W, generated_at: DateTime<Utc>) -> Self {
        Self {
            writer,
            run_id: None,
            generated_at,
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonSink<BufWriter<File>> {
    pub fn create(path: &Path, generated_at: DateTime<Utc>) -> anyhow::Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file), generated_at))
    }
}

impl<W: Write> OutputSink for JsonSink<W> {
    fn sink_name(&self) -> String {
        "json".to_string()
    }

    fn write(&mut self, records: &[NormalizedRecord]) -> anyhow::Result<()> {
        let mut sources: Vec<&str> = records.iter().map(|r| r.source_name.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();

        let document = JsonDocument {
            run_id: self.run_id,
            generated_at: self.generated_at,
            total_count: records.len(),
            sources,
            priority_breakdown: priority_breakdown(records),
            records,
        };

        serde_json::to_writer_pretty(&mut self.writer, &document)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        info!("Wrote {} records as a JSON document", records.len());
        Ok(())
    }
}

/// Counts per tier, every tier present.
pub fn priority_breakdown(records: &[NormalizedRecord]) -> BTreeMap<&'static str, usize> {
    let mut breakdown: BTreeMap<&'static str, usize> = Priority::ALL.iter().map(|p| (p.as_str(), 0)).collect();
    for record in records {
        *breakdown.entry(record.priority().as_str()).or_default() += 1;
    }
    breakdown
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total: usize,
    pub source_count: usize,
    pub priority_breakdown: BTreeMap<&'static str, usize>,
    pub top_sources: Vec<(String, usize)>,
    pub top_tags: Vec<(String, usize)>,
    pub newest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,
}

impl CollectionStats {
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let mut per_source: HashMap<&str, usize> = HashMap::new();
        let mut per_tag: HashMap<&str, usize> = HashMap::new();

        for record in records {
            *per_source.entry(record.source_name.as_str()).or_default() += 1;
            for tag in &record.source_tags {
                *per_tag.entry(tag.as_str()).or_default() += 1;
            }
        }

        let dates = records.iter().filter_map(|r| r.published_at);

        Self {
            total: records.len(),
            source_count: per_source.len(),
            priority_breakdown: priority_breakdown(records),
            top_sources: most_common(per_source, TOP_SOURCES),
            top_tags: most_common(per_tag, TOP_TAGS),
            newest: dates.clone().max(),
            oldest: dates.min(),
        }
    }
}

/// Highest counts first, ties broken alphabetically.
fn most_common(counts: HashMap<&str, usize>, limit: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
