//! ncc-ingest: chunk an NCC volume PDF, embed it, and upload it
//!
//! Usage:
//!   ncc-ingest ncc2022-volume-two.pdf --dry-run
//!   ncc-ingest ncc2022-volume-one.pdf --volume 1 --skip 400

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ncc_ingest::providers::{GeminiEmbedder, SupabaseStore};
use ncc_ingest::{report, ChunkPipeline, Credentials, IngestConfig, OutputSink, Volume};

/// Chunk an NCC volume by its table of contents and load it into the vector store.
#[derive(Parser)]
#[command(name = "ncc-ingest", version)]
struct Args {
    /// Path to the NCC volume PDF.
    pdf_path: PathBuf,

    /// Parse and chunk only; print the chunks instead of uploading.
    #[arg(long)]
    dry_run: bool,

    /// NCC volume number (1 or 2).
    #[arg(long, default_value = "2")]
    volume: Volume,

    /// Skip the first N chunks, to resume an interrupted upload. The dry-run
    /// listing numbers chunks from 1, so --skip N resumes at chunk N+1.
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// TOML file overriding chunking, batching, and retry settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// With --dry-run, print chunks as JSON lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ncc_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    if !args.pdf_path.exists() {
        bail!("PDF not found: {}", args.pdf_path.display());
    }

    let credentials = if args.dry_run {
        None
    } else {
        Some(Credentials::from_env()?)
    };

    let config = match &args.config {
        Some(path) => IngestConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => IngestConfig::default(),
    };

    let pipeline = ChunkPipeline::new(args.volume, &config)?;
    let chunks = pipeline.run_file(&args.pdf_path)?;

    let Some(credentials) = credentials else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if args.json {
            report::write_json_lines(&mut out, &chunks)?;
        } else {
            report::write_listing(&mut out, &chunks, config.chunking.max_chunk_chars)?;
        }
        out.flush()?;
        return Ok(());
    };

    let embedder = Arc::new(GeminiEmbedder::new(
        &config.embedding,
        credentials.gemini_api_key.clone(),
    )?);
    let store = Arc::new(SupabaseStore::new(&config.storage, &credentials)?);

    let summary = OutputSink::new(embedder, store, &config)
        .with_progress(true)
        .process(chunks, args.skip)
        .await?;

    tracing::info!(
        "Ingestion complete: {} uploaded, {} skipped",
        summary.uploaded,
        summary.skipped
    );
    Ok(())
}
