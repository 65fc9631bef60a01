//! Leek - peer-to-peer messaging between onion services
//!
//! A CLI that runs one chat session with a single peer over Tor.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use leek::config::{default_log_file, FileConfig};
use leek::logging::init_logging;

use commands::{ChatCommand, CommandExecutor, KeygenCommand, ProvisionCommand, Settings};

/// Leek - peer-to-peer messaging between onion services
///
/// Each node listens behind its own hidden service and sends through the
/// local Tor SOCKS proxy. Messages are plain JSON or sealed with a
/// pre-shared ChaCha20-Poly1305 key.
#[derive(Parser)]
#[command(name = "leek")]
#[command(version)]
#[command(about = "Peer-to-peer messaging between two Tor onion services")]
#[command(long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/leek/config.toml if present)
    #[arg(long, global = true, env = "LEEK_CONFIG")]
    config: Option<PathBuf>,

    /// Append-only event log (default: ~/leek_messaging.log)
    #[arg(long, global = true, env = "LEEK_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "LEEK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session with a peer
    Chat(ChatCommand),

    /// Load or create the session key
    Keygen(KeygenCommand),

    /// Write a provisioning QR code for the peer to scan
    Provision(ProvisionCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = FileConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| file.log_file.clone())
        .unwrap_or_else(default_log_file);
    init_logging(&log_file, &cli.log_level).context("Failed to initialize logging")?;

    let settings = Settings::new(file);

    match &cli.command {
        Commands::Chat(cmd) => cmd.execute(&settings),
        Commands::Keygen(cmd) => cmd.execute(&settings),
        Commands::Provision(cmd) => cmd.execute(&settings),
    }
}
