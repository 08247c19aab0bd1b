//! GoalPilot server
//!
//! Serves goal sessions over WebSocket (default) or stdio.

use anyhow::Context;
use clap::Parser;
use goalpilot::config::{
    ModelConfig, OrchestratorConfig, DEFAULT_CHUNK_THRESHOLD, DEFAULT_MAX_REPLANS,
    DEFAULT_MODEL_TIMEOUT_MS,
};
use goalpilot::dom::DEFAULT_CHUNK_SIZE;
use goalpilot::llm::ChatCompletionsClient;
use goalpilot::orchestrator::Orchestrator;
use goalpilot::protocol::{ws, SessionServer};
use goalpilot::sites::StaticSiteLookup;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// GoalPilot browser automation orchestrator
#[derive(Parser, Debug)]
#[command(name = "goalpilot")]
#[command(version)]
#[command(about = "Turns a goal and page snapshots into one browser action at a time")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Serve a single session over stdin/stdout instead of HTTP
    #[arg(long)]
    stdio: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Elements per chunk for oversized pages
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Summarized element count above which chunking is used
    #[arg(long, default_value_t = DEFAULT_CHUNK_THRESHOLD)]
    chunk_threshold: usize,

    /// Timeout for each model call, in milliseconds
    #[arg(long, default_value_t = DEFAULT_MODEL_TIMEOUT_MS)]
    model_timeout_ms: u64,

    /// Replans allowed per goal
    #[arg(long, default_value_t = DEFAULT_MAX_REPLANS)]
    max_replans: u32,

    /// Directory for per-goal journals
    #[arg(long)]
    journal_dir: Option<PathBuf>,

    /// JSON file of extra site name to URL mappings
    #[arg(long)]
    sites: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdio mode keeps stdout for protocol messages
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut builder = OrchestratorConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_threshold(args.chunk_threshold)
        .model_timeout_ms(args.model_timeout_ms)
        .max_replans(args.max_replans);
    if let Some(dir) = &args.journal_dir {
        builder = builder.journal_dir(dir);
    }
    let config = builder.build();

    let model_config = ModelConfig::from_env().context("model configuration")?;
    tracing::info!(
        deployment = %model_config.deployment,
        vision = %model_config.vision_deployment,
        "Model configured"
    );

    let mut orchestrator = Orchestrator::new(config, Arc::new(ChatCompletionsClient::new(model_config)));
    if let Some(path) = &args.sites {
        let sites = StaticSiteLookup::from_json_file(path)
            .with_context(|| format!("loading site table {}", path.display()))?;
        orchestrator = orchestrator.with_sites(Arc::new(sites));
    }

    let server = SessionServer::new(orchestrator);

    if args.stdio {
        server.run_stdio().await?;
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    tracing::info!("GoalPilot {} starting on {}", goalpilot::VERSION, addr);
    ws::serve(server, addr).await?;

    Ok(())
}
