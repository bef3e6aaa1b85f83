//! Conclave server binary.
//!
//! Usage:
//!   conclave
//!   conclave --config conclave.toml
//!   conclave --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `GEMINI_API_KEY` - Gemini API key (required)
//! - `GEMINI_MODEL_FAST` / `GEMINI_MODEL_SMART` - Model ids per tier
//! - `CONCLAVE_FAN_OUT` - `sequential` (default) or `concurrent`
//! - `CONCLAVE_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `CONCLAVE_CORS_ORIGINS` - CORS allowed origins (comma-separated)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use conclave_api::{AppState, ServerOptions, default_static_dir, serve};
use conclave_coordinator::{CoordinatorConfig, FanOutMode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "conclave", version, about = "Multi-agent SAP assistant over Gemini")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Bind address
    #[arg(short, long, env = "CONCLAVE_BIND_ADDR", default_value = "127.0.0.1")]
    bind: String,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding index.html and the UI assets
    #[arg(long, env = "CONCLAVE_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// CORS allowed origins
    #[arg(long, env = "CONCLAVE_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Option<Vec<String>>,

    /// Override the specialist fan-out mode
    #[arg(long)]
    fan_out: Option<FanOutMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,conclave_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match &cli.config {
        Some(path) => tracing::info!(path = %path.display(), "Loading configuration"),
        None => tracing::info!("Using default configuration"),
    }
    let mut config = CoordinatorConfig::load(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(fan_out) = cli.fan_out {
        config.pipeline.fan_out = fan_out;
    }

    // A missing API key stops startup here.
    let state = AppState::from_config(&config)?;

    tracing::info!(
        fast_model = %config.llm.fast_model,
        smart_model = %config.llm.smart_model,
        fan_out = ?config.pipeline.fan_out,
        "Pipeline ready"
    );

    if cli.bind == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 exposes the API on all interfaces and it has no authentication"
        );
    }

    let options = ServerOptions {
        cors_origins: cli
            .cors_origins
            .map(|origins| origins.into_iter().map(|o| o.trim().to_string()).collect()),
        static_dir: cli.static_dir.unwrap_or_else(default_static_dir),
        ..Default::default()
    };

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    serve(Arc::new(state), addr, options).await?;

    Ok(())
}
