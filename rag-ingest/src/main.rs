use anyhow::Result;
use clap::Parser;
use consultant_core::Settings;
use consultant_data_services::rag::get_embedding_model;
use consultant_data_services::{ChunkingConfig, IngestOutcome, IngestionPipeline};
use std::path::PathBuf;
use tracing::{info, Level};

/// Policy Document Ingestion CLI
///
/// Loads policy documents, splits them into overlapping chunks, embeds them
/// and persists the vector index used by the consultant.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of policy documents (defaults to DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Vector index directory (defaults to VECTOR_INDEX_PATH)
    #[arg(short, long)]
    index_path: Option<PathBuf>,

    /// Maximum chunk size in characters (defaults to CHUNK_SIZE)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared between chunks (defaults to CHUNK_OVERLAP)
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Rebuild the index even if one already exists
    #[arg(short, long)]
    force: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Apply command-line overrides on top of the environment settings
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(path) = &self.index_path {
            settings.index_path = path.clone();
        }
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            settings.chunk_overlap = overlap;
        }
        settings
    }

    /// Parse log level from string
    fn parse_log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(args.parse_log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Policy Document Ingestion Tool");
    info!("==============================");

    let settings = args.apply(Settings::from_env()?);
    let chunking = ChunkingConfig::from_settings(&settings);

    info!("Configuration:");
    info!("  Data dir: {}", settings.data_dir.display());
    info!("  Index: {}", settings.index_path.display());
    info!("  Chunk size: {} (overlap {})", chunking.chunk_size, chunking.chunk_overlap);
    info!("  Embedding model: {}", settings.embedding_model);
    info!("  Force rebuild: {}", args.force);
    info!("");

    info!("Loading embedding model...");
    let embedder = get_embedding_model(&settings)?;

    let pipeline = IngestionPipeline::new(&settings, &embedder).with_chunking(chunking);

    match pipeline.run(args.force)? {
        IngestOutcome::Built(stats) => {
            info!("");
            info!("Ingestion Complete!");
            info!("===================");
            info!("  Documents loaded: {}", stats.documents_loaded);
            info!("  Chunks created: {}", stats.chunks_created);
            info!("  Embeddings generated: {}", stats.embeddings_generated);
            info!("  Index: {}", pipeline.index_path().display());
        }
        IngestOutcome::Skipped => {
            info!("Nothing to do, index already present at {}", pipeline.index_path().display());
        }
    }

    Ok(())
}
