//! Natter API server.
//!
//! ```text
//! config file (optional) → validate → logging / metrics
//!     → audit sink (file or memory) → AppState → HttpServer
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use natter_api::audit::{AuditSink, FileAuditLog, MemoryAuditLog};
use natter_api::clock::SystemClock;
use natter_api::config::{load_config, validate_config, NatterConfig};
use natter_api::http::{shutdown_signal, AppState, HttpServer};
use natter_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "natter-api")]
#[command(about = "Access-controlled social messaging API", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => NatterConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("invalid configuration: {error}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("natter-api v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let audit_sink: Arc<dyn AuditSink> = match &config.audit.file_path {
        Some(path) => Arc::new(FileAuditLog::open(path)?),
        None => {
            tracing::warn!("No audit file configured; audit records are kept in memory only");
            Arc::new(MemoryAuditLog::new())
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        session_ttl_secs = config.session.ttl_secs,
        rate_limit_enabled = config.rate_limit.enabled,
        permits_per_second = config.rate_limit.permits_per_second,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = AppState::in_memory(config, Arc::new(SystemClock), audit_sink);
    HttpServer::from_state(state).run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
