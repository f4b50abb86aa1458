//! # ReviewFlow Server
//!
//! Entry point for the engine. `serve` runs the status and correlation API
//! against the configured backends; `ingest` pushes one local CSV through
//! the whole pipeline in-process, which is the single-node path end to end.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use reviewflow_core::config::ConfigManager;
use reviewflow_core::ingest::{DatasetUpload, MAPPING_METADATA_KEY};
use reviewflow_core::logging::init_structured_logging;
use reviewflow_core::system::ReviewFlowSystem;

#[derive(Parser, Debug)]
#[command(name = "reviewflow-server")]
#[command(about = "Job orchestration server for batched review enrichment")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path (default: discover under ./config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the status and correlation API
    Serve {
        /// Override the configured bind address, e.g. 127.0.0.1:8080
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ingest one CSV file through the local pipeline
    Ingest {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Column holding the review text
        #[arg(long, default_value = "review_text")]
        text_column: String,

        /// Optional column holding the review title
        #[arg(long)]
        title_column: Option<String>,

        /// Optional column holding the numeric rating
        #[arg(long)]
        rating_column: Option<String>,

        /// Comma-separated topical labels (defaults to the built-in list)
        #[arg(long)]
        topic_labels: Option<String>,

        /// Finalize the job once the batches drain
        #[arg(long)]
        stitch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let cli = Cli::parse();
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::load()?,
    };
    let config = manager.config().clone();

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.web.bind_address = bind;
            }
            let system = ReviewFlowSystem::bootstrap(config).await?;
            system.serve_web().await?;
        }
        Commands::Ingest {
            file,
            text_column,
            title_column,
            rating_column,
            topic_labels,
            stitch,
        } => {
            let system = ReviewFlowSystem::bootstrap(config).await?;
            let content = tokio::fs::read(&file).await?;

            let mut mapping = serde_json::Map::new();
            mapping.insert(
                "full_review_text".to_string(),
                serde_json::Value::String(text_column),
            );
            if let Some(title) = title_column {
                mapping.insert("title".to_string(), serde_json::Value::String(title));
            }
            if let Some(rating) = rating_column {
                mapping.insert("rating".to_string(), serde_json::Value::String(rating));
            }
            if let Some(labels) = topic_labels {
                mapping.insert(
                    "zero_shot_labels".to_string(),
                    serde_json::Value::String(labels),
                );
            }
            let mut metadata = HashMap::new();
            metadata.insert(
                MAPPING_METADATA_KEY.to_string(),
                serde_json::Value::Object(mapping).to_string(),
            );

            // Local files get a synthetic upload id so correlation lookup
            // works the same as for bucket-notified uploads
            let upload_id = Uuid::new_v4();
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload.csv");
            let upload = DatasetUpload::new(
                system.config().storage.source_bucket.clone(),
                format!("uploads/{upload_id}/{file_name}"),
                metadata,
                content,
            );

            let outcome = system.splitter().ingest(upload).await?;
            let job_id = outcome.job_id().to_string();
            info!(job_id = %job_id, upload_id = %upload_id, outcome = ?outcome, "Ingest accepted");

            system.drain_local_dispatch().await;

            if stitch {
                let stitched = system.stitcher().stitch(&job_id).await?;
                info!(job_id = %job_id, outcome = ?stitched, "Stitch finished");
            }

            if let Some(job) = system.store().get(&job_id).await? {
                info!(
                    job_id = %job.job_id,
                    status = %job.effective_status(),
                    processed_batches = job.processed_batches,
                    total_batches = job.total_batches,
                    "Final job state"
                );
            }
        }
    }

    Ok(())
}
