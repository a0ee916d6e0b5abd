//! Egress proxy configuration tool.
//!
//! # Commands
//! - `check <path>`: load the configuration once and print a summary
//! - `run <path>`: hold the configuration, reloading it on SIGHUP
//!
//! A failed reload keeps the previous configuration in place.

use std::path::PathBuf;
#[cfg(unix)]
use std::sync::Arc;

use cadence::Counted;
use clap::{Parser, Subcommand};

use egress_proxy::config::{ConfigLoader, ConfigStore};
use egress_proxy::observability::logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "egress-proxy")]
#[command(about = "Load and validate egress proxy configuration", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "egress_proxy=info")]
    log_filter: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration file and print a summary
    Check {
        path: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a configuration file and reload it on SIGHUP until stopped
    Run { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(&cli.log_filter, format);

    match cli.command {
        Commands::Check { path, json } => {
            let config = ConfigLoader::new().load(&path).map_err(|e| {
                tracing::error!(path = ?path, error = %e, "Configuration rejected");
                e
            })?;
            let summary = config.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
        Commands::Run { path } => run(path).await?,
    }

    Ok(())
}

#[cfg(unix)]
async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    use egress_proxy::lifecycle::signals::{LifecycleEvent, SignalListener};

    let loader = ConfigLoader::new();
    let store = Arc::new(ConfigStore::new(loader.load(&path)?));
    let mut signals = SignalListener::new()?;

    tracing::info!(path = ?path, "Waiting for SIGHUP to reload, SIGTERM to exit");

    loop {
        match signals.next().await {
            LifecycleEvent::Reload => {
                let reload = store.clone().reload_blocking(loader.clone(), path.clone());
                let outcome = match reload.await {
                    Ok(_previous) => "config.reload.success",
                    Err(_) => "config.reload.failure",
                };
                if let Err(e) = store.current().statsd.count(outcome, 1i64) {
                    tracing::debug!(error = %e, "Failed to emit reload metric");
                }
            }
            LifecycleEvent::Shutdown => break,
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(not(unix))]
async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let store = ConfigStore::new(ConfigLoader::new().load(&path)?);
    tracing::info!(port = store.current().port, "Configuration loaded, waiting for Ctrl-C");
    tokio::signal::ctrl_c().await?;
    Ok(())
}
