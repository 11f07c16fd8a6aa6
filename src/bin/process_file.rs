use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use docembed::{
    config::{DEFAULT_EMBEDDING_MODEL, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_OPENAI_BASE_URL},
    embedding::{EmbeddingClient, HashingEmbeddingClient, OpenAiEmbeddingClient},
    gateway::{InMemoryBackend, StatusEntry, StoredChunk},
    logging,
    metrics::MetricsSnapshot,
    processing::{DocumentContent, IngestionPipeline, ProcessingReport, ProcessingRequest},
    source::HttpDocumentFetcher,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "docembed-process",
    about = "Run the ingestion pipeline on a local file and print the result as JSON"
)]
struct Cli {
    /// Document to process.
    path: PathBuf,
    /// Format tag (pdf, word, excel, powerpoint). Inferred from the extension when omitted.
    #[arg(long)]
    format: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    max_chunk_size: usize,
    #[arg(long, value_enum, default_value_t = Provider::Hashing)]
    provider: Provider,
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    Hashing,
    Openai,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOutput {
    report: ProcessingReport,
    statuses: Vec<StatusEntry>,
    chunks: Vec<StoredChunk>,
    metrics: MetricsSnapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli_tracing();
    let cli = Cli::parse();

    let format = match cli.format {
        Some(format) => format,
        None => infer_format(&cli.path)?,
    };
    let bytes = tokio::fs::read(&cli.path)
        .await
        .with_context(|| format!("Failed to read {}", cli.path.display()))?;
    let file_name = cli
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.path.display().to_string());

    let backend = Arc::new(InMemoryBackend::new());
    let pipeline = IngestionPipeline::new(
        build_embedder(cli.provider)?,
        backend.clone(),
        backend.clone(),
        Arc::new(HttpDocumentFetcher::new(None)?),
        cli.max_chunk_size,
    );

    let request = ProcessingRequest {
        request_id: uuid::Uuid::new_v4().to_string(),
        file_name,
        format_tag: format,
        content: DocumentContent::Inline(bytes),
    };
    let report = ProcessingReport::from(pipeline.process(request).await);
    let succeeded = report.is_success();

    let output = CliOutput {
        report,
        statuses: backend.statuses().await,
        chunks: backend.chunks().await,
        metrics: pipeline.metrics_snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn infer_format(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| anyhow!("Cannot infer format for {}; pass --format", path.display()))
}

fn build_embedder(provider: Provider) -> Result<Arc<dyn EmbeddingClient + Send + Sync>> {
    match provider {
        Provider::Hashing => Ok(Arc::new(HashingEmbeddingClient::new())),
        Provider::Openai => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set for the openai provider")?;
            let base_url = std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
            let model = std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
            Ok(Arc::new(OpenAiEmbeddingClient::new(
                api_key, &base_url, &model,
            )?))
        }
    }
}
