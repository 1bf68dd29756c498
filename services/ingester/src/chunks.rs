//! Time chunk export for the embedding indexer.
//!
//! One JSON object per line:
//! `{"page_content": "<csv>", "metadata": {"start": .., "end": .., "rows": n}}`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use argo_common::{format_timestamp, SourcedRecord};
use ingestion::{TimeChunk, TimeWindower, WindowConfig};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct ChunkDocument {
    page_content: String,
    metadata: ChunkMetadata,
}

#[derive(Debug, Serialize)]
struct ChunkMetadata {
    start: String,
    end: String,
    rows: usize,
}

impl ChunkDocument {
    fn from_chunk(chunk: &TimeChunk<SourcedRecord>) -> Result<Self> {
        Ok(Self {
            page_content: chunk.payload()?,
            metadata: ChunkMetadata {
                start: format_timestamp(&chunk.start),
                end: format_timestamp(&chunk.end),
                rows: chunk.rows.len(),
            },
        })
    }
}

/// Write chunks as JSON lines. Returns the number of lines written.
pub fn write_chunks<W: Write>(mut writer: W, chunks: &[TimeChunk<SourcedRecord>]) -> Result<usize> {
    for chunk in chunks {
        serde_json::to_writer(&mut writer, &ChunkDocument::from_chunk(chunk)?)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(chunks.len())
}

/// Window the merged records and export the chunks to `path`.
pub fn export_chunks(records: &[SourcedRecord], window: WindowConfig, path: &Path) -> Result<usize> {
    let windower = TimeWindower::new(window)?;
    let chunks = windower.chunks(records);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create chunk file: {}", path.display()))?;
    let written = write_chunks(BufWriter::new(file), &chunks)?;

    info!(
        records = records.len(),
        chunks = written,
        width_days = window.width_days,
        overlap_days = window.overlap_days,
        path = %path.display(),
        "Exported time chunks"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use test_utils::{daily_records, temp_test_dir};

    fn sourced(days: usize) -> Vec<SourcedRecord> {
        let dataset: Arc<str> = Arc::from("R6903091_001");
        daily_records(days, 1)
            .into_iter()
            .map(|r| SourcedRecord::new(dataset.clone(), r))
            .collect()
    }

    #[test]
    fn test_chunk_lines() {
        let records = sourced(11);
        let chunks = TimeWindower::new(WindowConfig::default()).unwrap().chunks(&records);

        let mut out = Vec::new();
        assert_eq!(write_chunks(&mut out, &chunks).unwrap(), 4);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);

        let first = &lines[0];
        assert_eq!(first["metadata"]["start"], "2025-08-01T00:00:00Z");
        assert_eq!(first["metadata"]["end"], "2025-08-05T00:00:00Z");
        assert_eq!(first["metadata"]["rows"], 5);
        let content = first["page_content"].as_str().unwrap();
        assert!(content.starts_with("dataset,profile_id,depth_level,time,"));
        assert_eq!(content.lines().count(), 6);
    }

    #[test]
    fn test_export_creates_parent_dirs() {
        let dir = temp_test_dir();
        let path = dir.path().join("out/chunks.jsonl");

        let written = export_chunks(&sourced(4), WindowConfig::new(2, 1).unwrap(), &path).unwrap();
        assert_eq!(written, 4);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_export_rejects_invalid_window() {
        let dir = temp_test_dir();
        let window = WindowConfig {
            width_days: 2,
            overlap_days: 2,
        };
        assert!(export_chunks(&sourced(3), window, &dir.path().join("c.jsonl")).is_err());
    }
}
