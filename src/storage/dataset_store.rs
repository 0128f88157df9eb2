use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::PathsConfig;
use crate::models::{ExamRecord, FileAnalysis, Manifest};
use crate::storage::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Dataset,
    Report,
    Manifest,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Dataset => "dataset",
            Artifact::Report => "report",
            Artifact::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum PersistOutcome {
    /// The dataset equals the persisted one; nothing was written.
    Unchanged,
    Written {
        written: Vec<Artifact>,
        failed: Vec<(Artifact, String)>,
    },
}

impl PersistOutcome {
    pub fn failures(&self) -> &[(Artifact, String)] {
        match self {
            PersistOutcome::Unchanged => &[],
            PersistOutcome::Written { failed, .. } => failed,
        }
    }
}

/// All records in file-discovery order, then row order.
pub fn merge_records(analyses: &[FileAnalysis]) -> Vec<ExamRecord> {
    analyses
        .iter()
        .flat_map(|analysis| analysis.records.iter().cloned())
        .collect()
}

/// Persisted outputs of a run: merged dataset, inventory report and manifest.
pub struct DatasetStore {
    dataset_file: PathBuf,
    report_file: PathBuf,
    manifest_file: PathBuf,
}

impl DatasetStore {
    pub fn new(paths: &PathsConfig) -> Self {
        DatasetStore {
            dataset_file: paths.dataset_file.clone(),
            report_file: paths.report_file.clone(),
            manifest_file: paths.manifest_file.clone(),
        }
    }

    /// The previously persisted dataset; a missing or unreadable file counts as absent.
    pub fn load_previous(&self) -> Option<Vec<ExamRecord>> {
        if !self.dataset_file.exists() {
            return None;
        }

        match load_records(&self.dataset_file) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!("Ignoring previous dataset: {:#}", e);
                None
            }
        }
    }

    /// Compares parsed values, so formatting differences in the stored file
    /// never count as a change. A missing report or manifest always does.
    pub fn is_unchanged(&self, records: &[ExamRecord]) -> bool {
        if !self.report_file.is_file() || !self.manifest_file.is_file() {
            return false;
        }
        self.load_previous()
            .is_some_and(|previous| previous.as_slice() == records)
    }

    /// Writes report, manifest and dataset unless the dataset is unchanged.
    /// The dataset goes last since it is what the next run compares against.
    /// `render` is only called when something will be written.
    pub fn persist<F>(&self, records: &[ExamRecord], force: bool, render: F) -> PersistOutcome
    where
        F: FnOnce() -> (String, Manifest),
    {
        if !force && self.is_unchanged(records) {
            info!("Dataset unchanged ({} records), skipping writes", records.len());
            return PersistOutcome::Unchanged;
        }

        let (report, manifest) = render();
        let mut written = Vec::new();
        let mut failed = Vec::new();

        let attempts = [
            (Artifact::Report, self.write_report(&report)),
            (Artifact::Manifest, self.write_manifest(&manifest)),
            (Artifact::Dataset, self.write_dataset(records)),
        ];

        for (artifact, result) in attempts {
            match result {
                Ok(path) => {
                    info!("Wrote {} to {}", artifact, path.display());
                    written.push(artifact);
                }
                Err(e) => {
                    error!("Failed to write {}: {:#}", artifact, e);
                    failed.push((artifact, format!("{:#}", e)));
                }
            }
        }

        PersistOutcome::Written { written, failed }
    }

    fn write_dataset(&self, records: &[ExamRecord]) -> Result<&Path> {
        let json = serde_json::to_string(records)?;
        write_atomic(&self.dataset_file, json.as_bytes())?;
        Ok(&self.dataset_file)
    }

    fn write_report(&self, report: &str) -> Result<&Path> {
        write_atomic(&self.report_file, report.as_bytes())?;
        Ok(&self.report_file)
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<&Path> {
        let json = serde_json::to_string_pretty(manifest)?;
        write_atomic(&self.manifest_file, json.as_bytes())?;
        Ok(&self.manifest_file)
    }
}

fn load_records(path: &Path) -> Result<Vec<ExamRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(records)
}
