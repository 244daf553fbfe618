//! dwm-pipeline - Document Watermark Pipeline service
//!
//! Hosts one watermark workflow (select → upload → submit → poll) over
//! HTTP REST + SSE, talking to the watermark backend over HTTP.

use anyhow::Result;
use clap::Parser;
use dwm_common::events::EventBus;
use dwm_pipeline::clients::HttpBackendClient;
use dwm_pipeline::{AppState, Collaborators};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dwm-pipeline", version, about = "Document watermark pipeline service")]
struct Args {
    /// Configuration file (overrides DWM_CONFIG and the user config file)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Write the default configuration to the user config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init_config {
        let path = dwm_pipeline::config::default_config_path()?;
        if dwm_pipeline::config::write_default_config(&path)? {
            println!("Wrote {}", path.display());
        } else {
            println!("{} already exists", path.display());
        }
        return Ok(());
    }

    let (config, source) = dwm_pipeline::config::resolve_config(args.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting dwm-pipeline (Document Watermark Pipeline)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);
    info!("Backend: {}", config.backend.base_url);

    let client = Arc::new(HttpBackendClient::new(&config.backend)?);

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(256);

    let bind = config.server.bind.clone();
    let state = AppState::new(config, Collaborators::shared(client), event_bus);
    info!(workflow_id = %state.workflow.id(), "Workflow initialized");

    let app = dwm_pipeline::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
