//! socks5d - Standalone SOCKS5 proxy server
//!
//! This is the main entry point for the socks5d application.

use anyhow::{Context, Result};
use clap::Parser;
use socks5d::config::{resolve_config, ConfigOverrides};
use socks5d::server::serve;
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// socks5d - SOCKS5 proxy server with optional username/password authentication
#[derive(Parser, Debug)]
#[command(name = "socks5d")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on [default: 1080]
    #[arg(short, long)]
    port: Option<u16>,

    /// Username for authentication
    #[arg(short, long)]
    user: Option<String>,

    /// Password for authentication
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Address to listen on [default: 0.0.0.0]
    #[arg(long)]
    listen: Option<IpAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    let overrides = ConfigOverrides {
        listen_addr: args.listen,
        port: args.port,
        username: args.user,
        password: args.password,
    };
    let config = resolve_config(args.config.as_deref(), overrides)?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    info!("socks5d v{}", socks5d::VERSION);
    if let Some(path) = &args.config {
        info!("Configuration loaded from: {:?}", path);
    }

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C and termination signals (cross-platform)
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("Received Ctrl+C, shutting down...");
                        }
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, shutting down...");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to setup SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received Ctrl+C, shutting down...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // On Windows, only handle Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }

        let _ = shutdown_tx.send(true);
    });

    // Run the server
    serve(config, shutdown_rx)
        .await
        .context("SOCKS5 server failed")
}

/// Setup logging; `RUST_LOG` takes precedence over the command-line level
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
