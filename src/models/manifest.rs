use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary file read by the front end alongside the merged dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    pub files_processed: Vec<String>,
    pub total_records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
}

impl Manifest {
    pub fn new(generated_at: String, files_processed: Vec<String>, total_records: usize) -> Self {
        Self {
            generated_at,
            files_processed,
            total_records,
            source_url: None,
            source_title: None,
        }
    }

    /// Copies provenance from the crawler's metadata when it is available.
    pub fn with_source(mut self, source: Option<&SourceMetadata>) -> Self {
        if let Some(source) = source {
            self.source_url = Some(source.source_url.clone());
            self.source_title = Some(source.source_title.clone());
        }
        self
    }
}

/// Where the current spreadsheets came from, written by the notice crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source_url: String,
    pub source_title: String,
    pub downloaded_files: Vec<String>,
    pub updated_at: String,
}

impl SourceMetadata {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source metadata: {}", path.display()))?;
        let metadata = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse source metadata: {}", path.display()))?;
        Ok(metadata)
    }
}
