// PAT Agent - Reference Backend Server
// Run with: cargo run --bin pat-agent-server

//! # PAT Agent Server Binary
//!
//! Starts the backend the wizard client talks to. Settings come from
//! `pat-agent.toml` and `PAT_AGENT_*` variables (see `pat_agent::config`);
//! command-line flags override the listener.
//!
//! ```text
//! main()
//!   ↓ loads
//! Settings (defaults → file → environment)
//!   ↓ opens
//! FileHistory / InMemoryHistory · AlgorithmCatalog · ExampleIndex
//!   ↓ creates
//! LLM provider client (OpenAI / Anthropic, key from the environment)
//!   ↓ builds
//! WizardServer (Axum)
//! ```
//!
//! ## Rust Learning Notes:
//!
//! ### Async Main Function
//! `#[tokio::main]` turns the async `main` into a synchronous one that starts
//! the tokio runtime first, so `.await` can be used at the top level.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pat_agent::config::Settings;
use pat_agent::llm::providers::create_provider;
use pat_agent::server::{AlgorithmCatalog, ExampleIndex, FileHistory, HistoryStorage, InMemoryHistory, WizardServer};

#[derive(Parser)]
#[command(name = "pat-agent-server")]
#[command(about = "Reference backend for the PAT Agent wizard")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to pat-agent.toml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep histories in memory even if a history directory is configured
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real deployments set the variables directly
    if let Err(e) = dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_filter(false))),
        )
        .init();

    info!("🚀 Starting PAT Agent Server...");
    info!("=====================================");

    let history: Arc<dyn HistoryStorage> = match (&settings.server.history_dir, cli.in_memory) {
        (Some(dir), false) => {
            info!("📁 Histories in {}", dir.display());
            Arc::new(FileHistory::open(dir).await?)
        }
        _ => {
            info!("🧠 Histories kept in memory");
            Arc::new(InMemoryHistory::new())
        }
    };

    let mut builder = WizardServer::builder()
        .with_host(settings.server.host.clone())
        .with_port(settings.server.port)
        .with_cors(settings.server.cors)
        .with_history(history);

    if let Some(path) = &settings.server.algorithm_db {
        builder = builder.with_catalog(AlgorithmCatalog::open(path).await?);
    }
    if let Some(path) = &settings.server.example_db {
        builder = builder.with_examples(ExampleIndex::load(path)?);
    }
    if let Some(max_tokens) = settings.llm.max_tokens {
        builder = builder.with_max_tokens(max_tokens);
    }

    let provider_type = settings.llm.provider_type()?;
    match settings.llm.provider_settings_from_env()? {
        Some(provider_settings) => {
            let llm = create_provider(&provider_type, provider_settings)?;
            info!("✅ {} API key configured", provider_type);
            builder = builder.with_llm(llm);
        }
        None => warn!(
            "No API key for {}; model endpoints will answer 503",
            provider_type
        ),
    }

    builder
        .build()
        .run()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
