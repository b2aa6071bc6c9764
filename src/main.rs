//! TrapWatch Web Server Binary
//!
//! This binary starts the TrapWatch dashboard API, which tracks trap
//! statuses and relays detection requests to the local detection service.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (port 3001, platform config file)
//! trapwatch
//!
//! # Specify port, config file and status scheme
//! trapwatch --port 8080 --config ./trapwatch.toml --scheme cyclic4
//!
//! # Write the effective configuration to the config file and exit
//! trapwatch --scheme cyclic4 --write-config
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trapwatch::config::Config;
use trapwatch::constants::APP_NAME;
use trapwatch::models::TransitionScheme;
use trapwatch::web;

/// TrapWatch - dashboard API for household trap monitoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Configuration file.
    /// Defaults to the platform-specific config directory:
    /// - Linux: ~/.config/TrapWatch/config.toml
    /// - macOS: ~/Library/Application Support/TrapWatch/config.toml
    /// - Windows: %APPDATA%\TrapWatch\config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the trap status scheme (binary or cyclic4)
    #[arg(long)]
    scheme: Option<TransitionScheme>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(scheme) = args.scheme {
        config.dashboard.transition_scheme = scheme;
    }

    if args.write_config {
        match &args.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        info!("Configuration written");
        return Ok(());
    }

    info!(
        "{} v{} ({} traps, {} scheme)",
        APP_NAME,
        env!("CARGO_PKG_VERSION"),
        config.traps.len(),
        config.dashboard.transition_scheme.as_str()
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    web::run_server(config, addr).await
}
