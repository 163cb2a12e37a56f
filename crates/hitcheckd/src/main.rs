//! hitcheckd: HTTP front end for the hitcheck engine.
//!
//! Decodes `x`, `y`, `r` from a form body or query string, hands them to a
//! shared `CheckEngine`, and writes the JSON envelope back.

mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hit_core::{
    CheckEngine, EngineConfig, FileHistoryLedger, HistoryLedger, LogFormat, MemoryHistoryLedger,
    METRICS,
};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "hitcheckd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Point-in-area check service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "HITCHECK_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// TOML engine config (defaults apply when omitted)
    #[arg(long, env = "HITCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Persist history to this JSON-lines file instead of memory only
    #[arg(long, env = "HITCHECK_HISTORY_FILE")]
    history_file: Option<PathBuf>,

    /// Log format: text, compact or json
    #[arg(long, env = "HITCHECK_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    hit_core::init_tracing(args.log_format, level);

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let ledger: Arc<dyn HistoryLedger> = match &args.history_file {
        Some(path) => Arc::new(
            FileHistoryLedger::open(path)
                .await
                .with_context(|| format!("opening history file {}", path.display()))?,
        ),
        None => Arc::new(MemoryHistoryLedger::new()),
    };

    let engine = CheckEngine::new(&config, ledger);
    let app = server::router(engine);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, version = hit_core::VERSION, "hitcheckd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    METRICS.flush();
    info!("hitcheckd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
