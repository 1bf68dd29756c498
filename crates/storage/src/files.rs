//! Local output layout: `csvs/<stem>.csv` and `jsons/<stem>.json`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use argo_common::{DatasetMetadata, SourcedRecord};
use ingestion::{filter_table_by_profile, read_records, write_table, DatasetOutcome};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};

/// Paths produced for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDataset {
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
    pub rows: usize,
}

/// Where per-dataset tables and metadata documents are written.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    csv_dir: PathBuf,
    json_dir: PathBuf,
    join_metadata: bool,
}

impl OutputLayout {
    pub fn new(csv_dir: impl Into<PathBuf>, json_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_dir: csv_dir.into(),
            json_dir: json_dir.into(),
            join_metadata: false,
        }
    }

    /// `root/csvs` and `root/jsons`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("csvs"), root.join("jsons"))
    }

    /// Append the metadata fields to every CSV row.
    pub fn with_joined_metadata(mut self, join: bool) -> Self {
        self.join_metadata = join;
        self
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    pub fn create_dirs(&self) -> StorageResult<()> {
        std::fs::create_dir_all(&self.csv_dir)?;
        std::fs::create_dir_all(&self.json_dir)?;
        Ok(())
    }

    pub fn csv_path(&self, dataset_id: &str) -> StorageResult<PathBuf> {
        Ok(self.csv_dir.join(format!("{}.csv", dataset_stem(dataset_id)?)))
    }

    pub fn json_path(&self, dataset_id: &str) -> StorageResult<PathBuf> {
        Ok(self.json_dir.join(format!("{}.json", dataset_stem(dataset_id)?)))
    }

    /// Write a dataset's table and metadata.
    ///
    /// Datasets without records are not written and yield `None`.
    pub fn write_dataset(&self, outcome: &DatasetOutcome) -> StorageResult<Option<WrittenDataset>> {
        if !outcome.has_records() {
            debug!(dataset = %outcome.dataset_id, "No records, nothing written");
            return Ok(None);
        }
        self.create_dirs()?;

        let csv_path = self.csv_path(&outcome.dataset_id)?;
        let json_path = self.json_path(&outcome.dataset_id)?;

        let joined = self.join_metadata.then_some(&outcome.metadata);
        write_table(BufWriter::new(File::create(&csv_path)?), outcome.records(), joined)?;

        let mut json = BufWriter::new(File::create(&json_path)?);
        serde_json::to_writer_pretty(&mut json, &outcome.metadata)?;
        json.flush()?;

        info!(
            dataset = %outcome.dataset_id,
            rows = outcome.records().len(),
            csv = %csv_path.display(),
            "Saved dataset"
        );

        Ok(Some(WrittenDataset {
            csv_path,
            json_path,
            rows: outcome.records().len(),
        }))
    }

    /// Read a metadata document back.
    pub fn read_metadata(&self, dataset_id: &str) -> StorageResult<DatasetMetadata> {
        let file = File::open(self.json_path(dataset_id)?)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// All CSV tables under the csv directory, sorted by path.
    pub fn csv_files(&self) -> StorageResult<Vec<PathBuf>> {
        if !self.csv_dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.csv_dir).follow_links(true) {
            let entry = entry.map_err(|e| StorageError::InvalidPath(e.to_string()))?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("csv")
            {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load every table, tagging rows with the table's file stem.
    pub fn load_records(&self) -> StorageResult<Vec<SourcedRecord>> {
        let mut merged = Vec::new();
        for path in self.csv_files()? {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
            let dataset: Arc<str> = Arc::from(stem);

            let records = read_records(BufReader::new(File::open(&path)?))?;
            debug!(dataset = %dataset, rows = records.len(), "Loaded table");
            merged.extend(
                records
                    .into_iter()
                    .map(|r| SourcedRecord::new(dataset.clone(), r)),
            );
        }
        Ok(merged)
    }

    /// Rewrite every table keeping only rows of `profile_id`.
    ///
    /// Returns the number of tables rewritten.
    pub fn trim_profiles(&self, profile_id: u32) -> StorageResult<usize> {
        let files = self.csv_files()?;
        for path in &files {
            let tmp = path.with_extension("csv.tmp");
            let kept = filter_table_by_profile(
                BufReader::new(File::open(path)?),
                BufWriter::new(File::create(&tmp)?),
                profile_id,
            )?;
            std::fs::rename(&tmp, path)?;
            debug!(file = %path.display(), kept, "Trimmed table");
        }
        info!(tables = files.len(), profile_id, "Trimmed tables");
        Ok(files.len())
    }
}

/// File stem of a dataset id, e.g. `R6903091_001.nc` to `R6903091_001`.
fn dataset_stem(dataset_id: &str) -> StorageResult<&str> {
    Path::new(dataset_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StorageError::InvalidPath(dataset_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_common::CanonicalField;
    use ingestion::{process_dataset, AliasTable};
    use test_utils::{argo_multi_profile, missing_measurements, temp_test_dir};

    fn outcome(id: &str) -> DatasetOutcome {
        process_dataset(id, &argo_multi_profile(3, 2), &AliasTable::default())
    }

    #[test]
    fn test_paths_use_file_stem() {
        let layout = OutputLayout::under("/data/out");
        assert_eq!(
            layout.csv_path("R6903091_001.nc").unwrap(),
            PathBuf::from("/data/out/csvs/R6903091_001.csv")
        );
        assert_eq!(
            layout.json_path("https://host/geo/R6903091_001.nc").unwrap(),
            PathBuf::from("/data/out/jsons/R6903091_001.json")
        );
        assert!(layout.csv_path("").is_err());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = temp_test_dir();
        let layout = OutputLayout::under(dir.path());
        let outcome = outcome("R6903091_001.nc");

        let written = layout.write_dataset(&outcome).unwrap().unwrap();
        assert_eq!(written.rows, 6);
        assert!(written.csv_path.exists());

        let metadata = layout.read_metadata("R6903091_001.nc").unwrap();
        assert_eq!(metadata, outcome.metadata);
        assert!(metadata.range(CanonicalField::Temperature).is_some());

        let loaded = layout.load_records().unwrap();
        assert_eq!(loaded.len(), 6);
        assert_eq!(loaded[0].dataset.as_ref(), "R6903091_001");
        assert_eq!(loaded[0].record, outcome.records()[0]);
    }

    #[test]
    fn test_empty_dataset_not_written() {
        let dir = temp_test_dir();
        let layout = OutputLayout::under(dir.path());
        let empty = process_dataset("traj.nc", &missing_measurements(), &AliasTable::default());

        assert_eq!(layout.write_dataset(&empty).unwrap(), None);
        assert!(layout.csv_files().unwrap().is_empty());
    }

    #[test]
    fn test_trim_keeps_first_profile() {
        let dir = temp_test_dir();
        let layout = OutputLayout::under(dir.path()).with_joined_metadata(true);
        layout.write_dataset(&outcome("a.nc")).unwrap();
        layout.write_dataset(&outcome("b.nc")).unwrap();

        assert_eq!(layout.trim_profiles(0).unwrap(), 2);

        let loaded = layout.load_records().unwrap();
        assert_eq!(loaded.len(), 4);
        assert!(loaded.iter().all(|r| r.record.profile_id == 0));

        let header = std::fs::read_to_string(layout.csv_path("a.nc").unwrap()).unwrap();
        assert!(header.lines().next().unwrap().contains(",title,"));
    }
}
