//! Chat command: runs one messaging session with a peer.
//!
//! Anything not given as a flag is asked for on the terminal, in the same
//! order every time: peer address, sending mode, encryption.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use leek::config::{parse_socket_addr, Encryption, SendMode};
use leek::input::StdinLines;
use leek::session::{Session, SessionConfig};

use super::{CommandExecutor, Settings};

/// Start a chat session with a peer.
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Peer onion address (prompted for if omitted)
    #[arg(short, long, env = "LEEK_PEER")]
    pub peer: Option<String>,

    /// Sending mode: auto (a message every interval) or manual (type messages)
    #[arg(short, long, env = "LEEK_MODE")]
    pub mode: Option<SendMode>,

    /// Seal messages with the session key
    #[arg(long, conflicts_with = "plain")]
    pub encrypt: bool,

    /// Send messages as plain JSON
    #[arg(long, conflicts_with = "encrypt")]
    pub plain: bool,

    /// Write a provisioning QR code here (PNG, SVG for .svg, ASCII for .txt)
    #[arg(long, env = "LEEK_QR")]
    pub qr: Option<PathBuf>,

    /// Post directly to HOST:PORT instead of through the Tor proxy
    #[arg(long)]
    pub direct: Option<String>,

    /// Use this as our own onion address instead of reading the hostname file
    #[arg(long, env = "LEEK_LOCAL_ADDRESS")]
    pub local_address: Option<String>,

    /// Tor hidden service hostname file
    #[arg(long, env = "LEEK_HOSTNAME_FILE")]
    pub hostname_file: Option<PathBuf>,

    /// Session key file
    #[arg(long, env = "LEEK_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Listener bind address
    #[arg(long, env = "LEEK_LISTEN")]
    pub listen: Option<String>,

    /// Tor SOCKS5 proxy address
    #[arg(long, env = "LEEK_PROXY")]
    pub proxy: Option<String>,

    /// Port of the peer's hidden service
    #[arg(long, env = "LEEK_PEER_PORT")]
    pub peer_port: Option<u16>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause between automatic messages in milliseconds
    #[arg(long)]
    pub interval: Option<u64>,
}

impl CommandExecutor for ChatCommand {
    fn execute(&self, settings: &Settings) -> Result<()> {
        let config = self.session_config(settings)?;
        let address = settings.address_provider(
            self.local_address.as_deref(),
            self.hostname_file.as_deref(),
        );
        let session = Session::new(config, address);

        let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        let result = rt.block_on(async {
            let mut input = StdinLines::new();
            session.run(&mut input).await
        });
        // A pending stdin read would otherwise hold the runtime open.
        rt.shutdown_timeout(Duration::from_millis(100));

        result.context("Chat session failed")
    }
}

impl ChatCommand {
    fn session_config(&self, settings: &Settings) -> Result<SessionConfig> {
        let mut transport = settings
            .file
            .transport()
            .context("Invalid network settings in config file")?;

        if let Some(addr) = &self.listen {
            transport.listen_addr = parse_socket_addr(addr)?;
        }
        if let Some(addr) = &self.proxy {
            transport.proxy_addr = parse_socket_addr(addr)?;
        }
        if let Some(port) = self.peer_port {
            transport.peer_port = port;
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                bail!("--timeout must be at least one second");
            }
            transport.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.interval {
            transport.send_interval = Duration::from_millis(ms);
        }

        let mut config = SessionConfig::new(transport, settings.key_file(self.key_file.as_deref()));
        config.peer = self.peer.clone();
        config.send_mode = self.mode;
        config.encryption = self.encryption();
        config.qr_output = self.qr.clone().or_else(|| settings.file.qr_output.clone());
        config.direct = self.direct.clone();
        Ok(config)
    }

    fn encryption(&self) -> Option<Encryption> {
        match (self.encrypt, self.plain) {
            (true, _) => Some(Encryption::Encrypted),
            (_, true) => Some(Encryption::Plaintext),
            _ => None,
        }
    }
}
