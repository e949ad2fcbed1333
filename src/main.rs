//! Wirebridge - SOCKS5 to WireGuard userspace bridge
//!
//! Loads a wireproxy-style configuration, activates the tunnel, and relays
//! every accepted SOCKS5 connection through the tunnel's virtual network
//! stack until the process is asked to shut down.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wirebridge::config::{socks5_bind_addr, SectionKind, Sections};
use wirebridge::socks::Socks5Server;
use wirebridge::tunnel::{self, SystemProvider};
use wirebridge::{DeviceConfig, RelayEngine, ShutdownCoordinator};

/// CLI arguments for wirebridge
#[derive(Parser, Debug)]
#[command(name = "wirebridge")]
#[command(about = "SOCKS5 to WireGuard userspace bridge")]
#[command(version)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short = 'c',
        long = "config",
        visible_alias = "file",
        short_alias = 'f',
        default_value = "wireproxy.conf",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args)?;

    info!("starting wirebridge v{}", env!("CARGO_PKG_VERSION"));

    let raw = std::fs::read(&args.config)
        .with_context(|| format!("failed to read config file: {}", args.config.display()))?;
    let sections = Sections::tokenize(&raw, SectionKind::Preamble);
    let device = DeviceConfig::from_sections(&sections)?;

    let bind_addr = socks5_bind_addr(&sections)?;
    if bind_addr.is_empty() {
        bail!("not found Socks5 BindAddress");
    }

    debug!("control request:\n{}", device.ipc_request());
    for addr in &device.local_addresses {
        info!("interface address: {}", addr);
    }

    let shutdown = ShutdownCoordinator::new();

    let tun = tunnel::activate(&device, &SystemProvider)
        .context("failed to activate tunnel")?;

    let server = Socks5Server::bind(&bind_addr).await?;
    let engine = RelayEngine::new(server, tun.stack(), shutdown.sender());

    let relay_handle = tokio::spawn(async move {
        if let Err(e) = engine.serve().await {
            error!("relay engine error: {:#}", e);
        }
    });

    shutdown.listen_for_signals().await?;

    if let Err(e) = relay_handle.await {
        if !e.is_cancelled() {
            error!("relay task failed: {}", e);
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
