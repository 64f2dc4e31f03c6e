mod report;
mod runner;
mod toolkit;

use anyhow::{Context, Result};
use clap::Parser;
use consultant_core::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use report::ConsoleReporter;
use runner::{ExperimentConfig, ExperimentRunner};
use toolkit::ConsultantToolkit;

#[derive(Parser)]
#[command(name = "temperature-experiment")]
#[command(about = "Compare consultant answers under deterministic and creative sampling")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Read environment overrides from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to read env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "temperature_experiment={},consultant_llm={},consultant_data_services={},consultant_core={}",
                cli.log_level, cli.log_level, cli.log_level, cli.log_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::from_env()?;

    tracing::info!("Configuration:");
    tracing::info!("  Data dir: {}", settings.data_dir.display());
    tracing::info!("  Index: {}", settings.index_path.display());
    tracing::info!("  Embedding model: {}", settings.embedding_model);
    tracing::info!("  LLM model: {}", settings.llm_model);

    let index_path = settings.index_path.clone();
    let toolkit = ConsultantToolkit::new(settings)?;

    let mut console = ConsoleReporter::new(std::io::stdout());
    let report = ExperimentRunner::new(index_path, ExperimentConfig::default())
        .run(&toolkit, &mut console)
        .await?;

    if let runner::IndexSetup::Built { documents, chunks } = report.index_setup {
        tracing::info!("Indexed {} documents into {} chunks", documents, chunks);
    }
    if report.failed_cases() > 0 {
        tracing::warn!("{} of {} cases failed", report.failed_cases(), report.cases.len());
    }

    Ok(())
}
