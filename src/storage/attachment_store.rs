use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::fetcher::has_extension;
use crate::models::SourceMetadata;
use crate::storage::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Created,
    Replaced,
    Unchanged,
}

/// Downloaded spreadsheets on disk. A file is only rewritten when its content
/// hash changes.
pub struct AttachmentStore {
    dir: PathBuf,
    extensions: Vec<String>,
}

pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        AttachmentStore {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn store(&self, name: &str, bytes: &[u8]) -> Result<StoreOutcome> {
        let path = self.dir.join(name);

        let outcome = match std::fs::read(&path) {
            Ok(existing) if content_digest(&existing) == content_digest(bytes) => {
                info!("Unchanged attachment: {}", name);
                return Ok(StoreOutcome::Unchanged);
            }
            Ok(_) => StoreOutcome::Replaced,
            Err(_) => StoreOutcome::Created,
        };

        write_atomic(&path, bytes).with_context(|| format!("Failed to store attachment {}", name))?;
        info!("Stored attachment {} ({:?}, {} bytes)", name, outcome, bytes.len());
        Ok(outcome)
    }

    /// Deletes spreadsheets that are not in `keep`. Returns the removed names.
    pub fn remove_stale(&self, keep: &[String]) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut removed = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || !has_extension(&path, &self.extensions) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if keep.contains(&name) {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Removed stale spreadsheet: {}", name);
                    removed.push(name);
                }
                Err(e) => warn!("Failed to remove stale spreadsheet {}: {}", name, e),
            }
        }

        removed.sort();
        Ok(removed)
    }

    pub fn write_metadata(&self, path: &Path, metadata: &SourceMetadata) -> Result<()> {
        let json = serde_json::to_string_pretty(metadata)?;
        write_atomic(path, json.as_bytes())
            .with_context(|| format!("Failed to write source metadata {}", path.display()))
    }
}
