// ============================================
// File: crates/ooband-server/src/main.rs
// ============================================
//! # ooband Server Entry Point
//!
//! ## Creation Reason
//! Main entry point for the ooband interaction server binary.
//! Handles CLI parsing, logging setup, and server startup.
//!
//! ## Usage
//! ```bash
//! ooband-server start --config /etc/ooband/server.toml
//! ooband-server validate --config ./server.toml
//! ooband-server print-config > server.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A missing config file falls back to defaults; a broken one is fatal
//! - `RUST_LOG` overrides `logging.level`
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ooband_core::protocol::Protocol;
use ooband_server::{Server, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// ooband out-of-band interaction server
#[derive(Parser, Debug)]
#[command(name = "ooband-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/ooband/server.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/ooband/server.toml")]
        config: PathBuf,
    },

    /// Print the default configuration as TOML
    PrintConfig,
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging("info");

    let result = match cli.command {
        Commands::Start { config } => cmd_start(&config).await,
        Commands::Validate { config } => cmd_validate(&config).await,
        Commands::PrintConfig => {
            print!("{}", ServerConfig::default().to_toml());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the server.
async fn cmd_start(config_path: &Path) -> anyhow::Result<()> {
    let config = load_or_default_config(config_path).await?;

    // Re-initialize logging with config level
    init_logging(&config.logging.level);

    info!("════════════════════════════════════════");
    info!("Domain:     {}", config.network.normalized_domain());
    info!("Public IP:  {}", config.network.public_ip);
    info!("Protocols:  {}", protocol_list(&config));
    info!("Identifier: {} chars", config.identifier_len());
    info!("════════════════════════════════════════");

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(config_path).await?;
    let network = &config.network;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Domain:     {}", network.normalized_domain());
    println!("   Public IP:  {}", network.public_ip);
    println!("   Protocols:  {}", protocol_list(&config));
    println!("   DNS:        {}", network.dns_addr());
    println!("   HTTP:       {}", network.http_addr());
    for addr in network.smtp_addrs() {
        println!("   SMTP:       {addr}");
    }
    println!();
    println!("Limits:");
    println!("   Max Sessions:     {}", config.limits.max_sessions);
    println!("   Session Timeout:  {}s", config.limits.session_timeout_secs);
    println!("   Callback Budget:  {}ms", config.limits.callback_timeout_ms);
    println!();
    println!("Storage:");
    println!("   Interaction TTL:  {}s", config.storage.interaction_ttl_secs);
    println!("   Per Session Cap:  {}", config.storage.max_interactions_per_session);
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config, or defaults when the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        info!("Config file not found, using defaults");
        Ok(ServerConfig::default())
    }
}

fn protocol_list(config: &ServerConfig) -> String {
    [Protocol::Dns, Protocol::Http, Protocol::Smtp]
        .into_iter()
        .filter(|p| config.network.is_enabled(*p))
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
