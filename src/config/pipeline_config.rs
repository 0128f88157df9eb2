use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::CrawlerConfig;
use crate::models::CanonicalField;
use crate::processor::SchemaMapper;

pub const DEFAULT_CONFIG_PATH: &str = "src/configs/pipeline.toml";
pub const CONFIG_PATH_ENV: &str = "EXAM_PIPELINE_CONFIG";

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub processing: ProcessingConfig,
    pub crawler: CrawlerConfig,
    /// Extra column aliases per canonical field key, tried after the built-in ones.
    pub aliases: BTreeMap<String, Vec<String>>,
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub dataset_file: PathBuf,
    pub report_file: PathBuf,
    pub manifest_file: PathBuf,
    pub source_metadata_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Spreadsheet row number of the first data row.
    pub header_offset: usize,
    pub extensions: Vec<String>,
    pub max_report_errors: usize,
    pub sample_rows: usize,
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;

        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.processing.extensions.is_empty() {
            return Err(anyhow::anyhow!("At least one spreadsheet extension is required"));
        }

        for key in self.aliases.keys() {
            if CanonicalField::from_key(key).is_none() {
                return Err(anyhow::anyhow!("Unknown canonical field in [aliases]: {}", key));
            }
        }

        Ok(())
    }

    /// Built-in alias table extended with the configured aliases.
    pub fn schema_mapper(&self) -> SchemaMapper {
        let mut mapper = SchemaMapper::new();
        for (key, aliases) in &self.aliases {
            if let Some(field) = CanonicalField::from_key(key) {
                for alias in aliases {
                    mapper.add_alias(field, alias.clone());
                }
            }
        }
        mapper
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("public/data"),
            dataset_file: PathBuf::from("public/data/all_exams.json"),
            report_file: PathBuf::from("public/data/DATA_INVENTORY.md"),
            manifest_file: PathBuf::from("public/data/data_summary.json"),
            source_metadata_file: PathBuf::from("public/data/source_metadata.json"),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            header_offset: 2,
            extensions: vec!["xlsx".to_string(), "xls".to_string()],
            max_report_errors: 10,
            sample_rows: 3,
        }
    }
}
