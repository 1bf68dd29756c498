//! Ingestion pipeline: list, fetch, extract and store dataset files.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use ingestion::{process_dataset, AliasTable, DatasetOutcome};
use netcdf_parser::NetCdfDataset;
use storage::{Catalog, OutputLayout};

use crate::config::IngesterConfig;
use crate::sources::{create_source, DatasetSource, RemoteFile};

/// Counts for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub listed: usize,
    /// Datasets with at least one record, written to the outputs
    pub stored: usize,
    /// Datasets that parsed but produced no records
    pub empty: usize,
    /// Datasets that failed to fetch, parse or store
    pub failed: usize,
    pub rows: usize,
}

enum FileResult {
    Stored { rows: usize },
    Empty,
}

/// Main ingestion pipeline.
pub struct IngestionPipeline {
    source: Box<dyn DatasetSource>,
    layout: OutputLayout,
    catalog: Option<Catalog>,
    aliases: Arc<AliasTable>,
    parallel_downloads: usize,
}

impl IngestionPipeline {
    /// Create a new ingestion pipeline.
    pub async fn new(config: &IngesterConfig) -> Result<Self> {
        let source = create_source(&config.source, Duration::from_secs(config.timeout_secs))?;

        let catalog = match &config.database_url {
            Some(url) => {
                let catalog = Catalog::connect(url).await?;
                catalog.migrate().await?;
                Some(catalog)
            }
            None => None,
        };

        Ok(Self::from_parts(
            source,
            config.output.layout(),
            catalog,
            config.aliases.clone(),
            config.parallel_downloads,
        ))
    }

    pub fn from_parts(
        source: Box<dyn DatasetSource>,
        layout: OutputLayout,
        catalog: Option<Catalog>,
        aliases: AliasTable,
        parallel_downloads: usize,
    ) -> Self {
        Self {
            source,
            layout,
            catalog,
            aliases: Arc::new(aliases),
            parallel_downloads: parallel_downloads.max(1),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Ingest every file the source lists.
    ///
    /// A failing file is logged and counted; it never stops the others.
    pub async fn run(&self) -> Result<IngestSummary> {
        let files = self.source.list_files().await?;
        let mut summary = IngestSummary {
            listed: files.len(),
            ..Default::default()
        };

        info!(
            files = files.len(),
            parallel = self.parallel_downloads,
            "Starting ingestion"
        );

        let results: Vec<_> = stream::iter(files)
            .map(|file| async move {
                let result = self.ingest_file(&file).await;
                (file, result)
            })
            .buffer_unordered(self.parallel_downloads)
            .collect()
            .await;

        for (file, result) in results {
            match result {
                Ok(FileResult::Stored { rows }) => {
                    summary.stored += 1;
                    summary.rows += rows;
                    metrics::counter!("ingester_datasets_total", "outcome" => "stored").increment(1);
                    metrics::counter!("ingester_rows_total").increment(rows as u64);
                }
                Ok(FileResult::Empty) => {
                    summary.empty += 1;
                    metrics::counter!("ingester_datasets_total", "outcome" => "empty").increment(1);
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::counter!("ingester_datasets_total", "outcome" => "failed").increment(1);
                    error!(file = %file.name, error = %e, "File ingestion failed");
                }
            }
        }

        info!(
            listed = summary.listed,
            stored = summary.stored,
            empty = summary.empty,
            failed = summary.failed,
            rows = summary.rows,
            "Ingestion completed"
        );
        Ok(summary)
    }

    /// Fetch, extract and store a single file.
    #[instrument(skip(self, file), fields(file = %file.name))]
    async fn ingest_file(&self, file: &RemoteFile) -> Result<FileResult> {
        let data = self.source.fetch_file(file).await?;

        let name = file.name.clone();
        let aliases = self.aliases.clone();
        let layout = self.layout.clone();

        // Parsing and file output are blocking
        let outcome = tokio::task::spawn_blocking(move || -> Result<DatasetOutcome> {
            let dataset = NetCdfDataset::from_bytes(&data)
                .with_context(|| format!("Failed to open {}", name))?;
            let outcome = process_dataset(&name, &dataset, &aliases);
            layout.write_dataset(&outcome)?;
            Ok(outcome)
        })
        .await??;

        if !outcome.has_records() {
            debug!("Nothing to store");
            return Ok(FileResult::Empty);
        }

        if let Some(catalog) = &self.catalog {
            catalog
                .register_metadata(&outcome.dataset_id, &outcome.metadata)
                .await?;
            catalog
                .insert_measurements(&outcome.dataset_id, outcome.records())
                .await?;
        }

        Ok(FileResult::Stored {
            rows: outcome.records().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use test_utils::temp_test_dir;

    /// Serves fixed bytes per file name.
    struct StaticSource {
        files: HashMap<String, Bytes>,
    }

    #[async_trait]
    impl DatasetSource for StaticSource {
        async fn list_files(&self) -> Result<Vec<RemoteFile>> {
            let mut names: Vec<_> = self.files.keys().cloned().collect();
            names.sort();
            Ok(names
                .into_iter()
                .map(|name| RemoteFile {
                    location: format!("memory://{}", name),
                    name,
                })
                .collect())
        }

        async fn fetch_file(&self, file: &RemoteFile) -> Result<Bytes> {
            self.files
                .get(&file.name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing {}", file.name))
        }
    }

    #[tokio::test]
    async fn test_unreadable_files_are_counted_not_fatal() {
        let dir = temp_test_dir();
        let files = ["a.nc", "b.nc", "c.nc"]
            .into_iter()
            .map(|n| (n.to_string(), Bytes::from_static(b"not a netcdf file")))
            .collect();
        let pipeline = IngestionPipeline::from_parts(
            Box::new(StaticSource { files }),
            OutputLayout::under(dir.path()),
            None,
            AliasTable::default(),
            2,
        );

        let summary = pipeline.run().await.unwrap();
        assert_eq!(
            summary,
            IngestSummary {
                listed: 3,
                failed: 3,
                ..Default::default()
            }
        );
        assert!(pipeline.layout().csv_files().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let dir = temp_test_dir();
        let pipeline = IngestionPipeline::from_parts(
            Box::new(StaticSource {
                files: HashMap::new(),
            }),
            OutputLayout::under(dir.path()),
            None,
            AliasTable::default(),
            0,
        );

        assert_eq!(pipeline.run().await.unwrap(), IngestSummary::default());
    }
}
