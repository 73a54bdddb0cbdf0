use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use monit_exporter::{prometheus, Exporter, ExporterConfig};

#[derive(Parser, Debug)]
#[command(name = "monit-exporter")]
#[command(about = "Prometheus exporter for Monit service checks and ejabberd sessions")]
struct Args {
    /// Configuration file for the exporter
    #[arg(short, long, default_value = "./config.toml")]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ExporterConfig::load(&args.conf)?;
    if config.ignore_ssl {
        warn!("TLS certificate verification is disabled for Monit and ejabberd");
    }

    let exporter =
        Arc::new(Exporter::from_config(&config).context("Failed to set up backend clients")?);

    info!("Starting monit_exporter: {}", config.listen_address);
    let listener = TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("Failed to listen on {}", config.listen_address))?;

    prometheus::serve(listener, exporter, config.metrics_path, shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
