use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sessiongate_backend::{config::Settings, create_router, open_store, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Credential and session service
#[derive(Debug, Parser)]
#[command(name = "sessiongate", version, about)]
struct Args {
    /// Config file (toml, yaml or json). Without it, `sessiongate.*` in the
    /// working directory is used if present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(level: &str, json: bool) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Settings::load().context("loading config")?,
    };
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    init_tracing(&settings.log_level, args.json_logs);

    let addr = settings.bind_addr()?;
    let store = open_store(&settings).context("opening user store")?;
    let cleanup_every = settings.cleanup_interval();
    let backend = settings.storage.backend;

    let state = Arc::new(AppState::new(store, settings));
    let _cleanup = state.sessions.spawn_cleanup_task(cleanup_every);

    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, ?backend, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
