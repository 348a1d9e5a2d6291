use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_info, engine_warn, LogDestination};
use log::LevelFilter;
use unfurl_engine::Unfurler;
use unfurl_server::{build_router, AppState, ServerConfig};

/// Link-preview service for the guestbook.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the RON config file.
    #[arg(long, default_value = "unfurl.ron")]
    config: PathBuf,
    /// Address to listen on, overriding config and environment.
    #[arg(long)]
    bind: Option<String>,
    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration (RON file + env overrides + CLI)
    let mut config = ServerConfig::load(&args.config)?;
    config.apply_env_overrides();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(log_file) = args.log_file {
        config.log_file = Some(log_file);
    }

    let level = engine_logging::parse_level(&config.log_level).unwrap_or(LevelFilter::Info);
    let destination = match config.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    let unfurler = Unfurler::new(config.unfurl_settings()).context("failed to build http client")?;
    let state = Arc::new(AppState {
        unfurler: Arc::new(unfurler),
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    engine_info!("Unfurl server listening on {}", config.bind);

    // Serve with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                engine_warn!("Failed to listen for Ctrl+C: {}", err);
                std::future::pending::<()>().await;
            }
            engine_info!("Shutdown signal received, stopping gracefully...");
        })
        .await
        .context("server error")?;

    engine_info!("Unfurl server stopped");
    Ok(())
}
