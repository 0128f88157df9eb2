use anyhow::{Context, Result, anyhow};
use chrono::Local;
use config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, PipelineConfig};
use fetcher::{NoticeCrawler, discover_spreadsheets, read_sheet};
use models::{GlobalSummary, Manifest, SourceMetadata};
use processor::FileAnalyzer;
use report::InventoryReport;
use std::env;
use std::path::Path;
use storage::{AttachmentStore, DatasetStore, PersistOutcome, StoreOutcome, merge_records};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod fetcher;
mod models;
mod processor;
mod report;
mod storage;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let crawl = env::args().any(|arg| arg == "--crawl" || arg == "-c");
    let force = env::args().any(|arg| arg == "--force" || arg == "-f");

    let config = load_config()?;

    if crawl {
        info!("🌐 Checking the announcement list for a new exam schedule");
        if let Err(e) = crawl_attachments(&config).await {
            // Existing spreadsheets are still processed
            error!("❌ Crawl failed: {:#}", e);
        }
    }

    info!("🚀 Starting exam schedule pipeline");
    run_pipeline(&config, force)
}

fn load_config() -> Result<PipelineConfig> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        info!("Loading configuration from {} ({})", path, CONFIG_PATH_ENV);
        return PipelineConfig::from_file(&path);
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
        return PipelineConfig::from_file(DEFAULT_CONFIG_PATH);
    }

    warn!("No configuration file found, using defaults");
    Ok(PipelineConfig::default())
}

async fn crawl_attachments(config: &PipelineConfig) -> Result<()> {
    let crawler = NoticeCrawler::new(config.crawler.clone()).context("Failed to build HTTP client")?;
    let store = AttachmentStore::new(
        config.paths.data_dir.clone(),
        config.processing.extensions.clone(),
    );

    let report = crawler
        .sync(&store, &config.paths.source_metadata_file)
        .await?;

    let changed = report
        .stored
        .iter()
        .filter(|(_, outcome)| *outcome != StoreOutcome::Unchanged)
        .count();
    info!(
        "📥 Crawl finished: {} attachments stored ({} changed), {} failed, {} stale removed",
        report.stored.len(),
        changed,
        report.failed.len(),
        report.removed.len()
    );

    Ok(())
}

fn run_pipeline(config: &PipelineConfig, force: bool) -> Result<()> {
    let data_dir = &config.paths.data_dir;
    if !data_dir.exists() {
        warn!("Data directory {} does not exist, nothing to process", data_dir.display());
        return Ok(());
    }

    let files = discover_spreadsheets(data_dir, &config.processing.extensions)?;
    if files.is_empty() {
        warn!("No spreadsheets found in {}", data_dir.display());
        return Ok(());
    }
    info!("Found {} spreadsheets in {}", files.len(), data_dir.display());

    let analyzer = FileAnalyzer::new(config.schema_mapper(), &config.processing)?;
    let mut analyses = Vec::new();
    let mut failed_files = Vec::new();

    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("\n=== Processing {} ===", file_name);

        match read_sheet(path) {
            Ok(sheet) => analyses.push(analyzer.analyze(&file_name, &sheet)),
            Err(e) => {
                error!("❌ Skipping {}: {}", file_name, e);
                failed_files.push(file_name);
            }
        }
    }

    let records = merge_records(&analyses);
    let summary = GlobalSummary::from_analyses(&analyses, &failed_files);
    info!(
        "📊 {} records from {} files, {} parsed, {} with time errors",
        summary.total_records,
        analyses.len(),
        summary.parsed,
        summary.failed
    );

    let store = DatasetStore::new(&config.paths);
    let outcome = store.persist(&records, force, || {
        let now = Local::now();
        let generated_on = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let report = InventoryReport {
            generated_at: &generated_on,
            summary: &summary,
            analyses: &analyses,
            mapper: analyzer.mapper(),
            max_errors: config.processing.max_report_errors,
        }
        .to_string();

        let source = load_source_metadata(&config.paths.source_metadata_file);
        let files_processed = analyses.iter().map(|a| a.file_name.clone()).collect();
        let manifest = Manifest::new(now.to_rfc3339(), files_processed, records.len())
            .with_source(source.as_ref());

        (report, manifest)
    });

    match &outcome {
        PersistOutcome::Unchanged => info!("✅ No changes in exam data"),
        PersistOutcome::Written { written, failed } if failed.is_empty() => {
            info!("🎉 Exam data updated ({} artifacts written)", written.len());
        }
        PersistOutcome::Written { .. } => {}
    }

    let failures = outcome.failures();
    if !failures.is_empty() {
        let names: Vec<String> = failures.iter().map(|(artifact, _)| artifact.to_string()).collect();
        return Err(anyhow!("Failed to write: {}", names.join(", ")));
    }

    Ok(())
}

fn load_source_metadata(path: &Path) -> Option<SourceMetadata> {
    if !path.exists() {
        return None;
    }
    match SourceMetadata::from_file(path) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            warn!("Ignoring source metadata: {:#}", e);
            None
        }
    }
}
