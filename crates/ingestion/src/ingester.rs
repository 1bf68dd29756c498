//! Per-dataset pipeline: resolve, extract, aggregate.

use std::sync::Arc;

use argo_common::{DatasetMetadata, MeasurementRecord, SourcedRecord};
use netcdf_parser::Dataset;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::aggregate_metadata;
use crate::config::AliasTable;
use crate::extractor::{extract_positions, extract_profiles, Extraction};
use crate::resolver::ResolvedVariables;

/// Everything produced for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOutcome {
    /// Caller-chosen identity, usually the source file name.
    pub dataset_id: String,
    pub extraction: Extraction,
    pub metadata: DatasetMetadata,
}

impl DatasetOutcome {
    pub fn records(&self) -> &[MeasurementRecord] {
        self.extraction.records()
    }

    /// Whether the dataset contributed any rows.
    pub fn has_records(&self) -> bool {
        !self.extraction.is_empty()
    }
}

/// Run the full per-dataset pipeline.
///
/// Never fails: a dataset without usable data yields an empty extraction
/// and a metadata record of raw attributes only.
#[instrument(skip(dataset, aliases), fields(dataset = %dataset_id))]
pub fn process_dataset<D: Dataset + ?Sized>(
    dataset_id: &str,
    dataset: &D,
    aliases: &AliasTable,
) -> DatasetOutcome {
    let resolved = ResolvedVariables::resolve(dataset, aliases);
    let extraction = extract_profiles(dataset, &resolved);

    match &extraction {
        Extraction::Records(records) => {
            debug!(records = records.len(), "Extracted records");
        }
        Extraction::MissingVariables(missing) => {
            warn!(missing = ?missing, "No usable data: mandatory variables not found");
        }
        Extraction::UnsupportedRank(rank) => {
            warn!(rank, "No usable data: unsupported temperature rank");
        }
    }

    let positions = if extraction.is_empty() {
        None
    } else {
        extract_positions(dataset, &resolved)
    };
    let metadata = aggregate_metadata(
        &dataset.attributes(),
        extraction.records(),
        positions.as_ref(),
    );

    DatasetOutcome {
        dataset_id: dataset_id.to_string(),
        extraction,
        metadata,
    }
}

/// Process many datasets in parallel. Output order follows input order.
pub fn process_batch<D: Dataset + Sync>(
    datasets: &[(String, D)],
    aliases: &AliasTable,
) -> Vec<DatasetOutcome> {
    let outcomes: Vec<DatasetOutcome> = datasets
        .par_iter()
        .map(|(id, dataset)| process_dataset(id, dataset, aliases))
        .collect();

    let usable = outcomes.iter().filter(|o| o.has_records()).count();
    info!(
        datasets = outcomes.len(),
        usable,
        records = outcomes.iter().map(|o| o.records().len()).sum::<usize>(),
        "Processed dataset batch"
    );
    outcomes
}

/// Merge the records of many datasets, tagging each with its dataset id.
pub fn merge_records(outcomes: &[DatasetOutcome]) -> Vec<SourcedRecord> {
    outcomes
        .iter()
        .flat_map(|outcome| {
            let id: Arc<str> = Arc::from(outcome.dataset_id.as_str());
            outcome
                .records()
                .iter()
                .map(move |r| SourcedRecord::new(id.clone(), r.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_parser::{ArrayData, MemoryDataset};

    fn profile(temps: Vec<f64>) -> MemoryDataset {
        let depths = temps.len();
        MemoryDataset::new()
            .with_attribute("title", "Argo float vertical profile")
            .with_variable("TEMP", ArrayData::vector(temps))
            .with_variable("PRES", ArrayData::vector((0..depths).map(|d| d as f64 * 10.0).collect()))
    }

    #[test]
    fn test_missing_variables_give_attributes_only() {
        let ds = MemoryDataset::new()
            .with_attribute("title", "Trajectory file")
            .with_variable("JULD", ArrayData::vector(vec![1.0]));
        let outcome = process_dataset("R1_traj.nc", &ds, &AliasTable::default());

        assert!(!outcome.has_records());
        assert!(matches!(outcome.extraction, Extraction::MissingVariables(_)));
        assert_eq!(outcome.metadata.len(), 1);
        assert_eq!(outcome.metadata.text("title").as_deref(), Some("Trajectory file"));
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let datasets = vec![
            ("a.nc".to_string(), profile(vec![5.0, 6.0])),
            ("b.nc".to_string(), MemoryDataset::new()),
            ("c.nc".to_string(), profile(vec![3.0])),
        ];
        let outcomes = process_batch(&datasets, &AliasTable::default());

        let ids: Vec<_> = outcomes.iter().map(|o| o.dataset_id.as_str()).collect();
        assert_eq!(ids, vec!["a.nc", "b.nc", "c.nc"]);
        assert_eq!(outcomes[0].records().len(), 2);
        assert!(!outcomes[1].has_records());
    }

    #[test]
    fn test_merge_tags_dataset() {
        let datasets = vec![
            ("a.nc".to_string(), profile(vec![5.0])),
            ("b.nc".to_string(), profile(vec![6.0, 7.0])),
        ];
        let merged = merge_records(&process_batch(&datasets, &AliasTable::default()));

        let tags: Vec<_> = merged.iter().map(|r| r.dataset.as_ref()).collect();
        assert_eq!(tags, vec!["a.nc", "b.nc", "b.nc"]);
    }
}
