//! Provisioning command: writes the QR code a peer scans to reach us.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use leek::crypto::load_or_create_key;
use leek::qr::{write_provisioning_qr, ProvisioningPayload, QrFormat};

use super::{CommandExecutor, Settings};

/// Write a provisioning QR code without starting a session.
#[derive(Args, Debug)]
pub struct ProvisionCommand {
    /// Output file path (PNG, SVG for .svg, ASCII for .txt)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Include the session key (creating it if needed)
    #[arg(long)]
    pub with_key: bool,

    /// Use this as our own onion address instead of reading the hostname file
    #[arg(long, env = "LEEK_LOCAL_ADDRESS")]
    pub local_address: Option<String>,

    /// Tor hidden service hostname file
    #[arg(long, env = "LEEK_HOSTNAME_FILE")]
    pub hostname_file: Option<PathBuf>,

    /// Session key file
    #[arg(long, env = "LEEK_KEY_FILE")]
    pub key_file: Option<PathBuf>,
}

impl CommandExecutor for ProvisionCommand {
    fn execute(&self, settings: &Settings) -> Result<()> {
        let local = settings
            .address_provider(self.local_address.as_deref(), self.hostname_file.as_deref())
            .local_address()
            .context("Failed to read local onion address")?;

        let key = if self.with_key {
            let path = settings.key_file(self.key_file.as_deref());
            Some(
                load_or_create_key(&path)
                    .with_context(|| format!("Failed to load session key from {}", path.display()))?,
            )
        } else {
            None
        };

        let payload = ProvisioningPayload::new(local.as_str(), key.as_ref());
        write_provisioning_qr(&payload, &self.output).context("Failed to generate QR code")?;

        println!("QR code generated: {}", self.output.display());
        println!("  Onion address: {}", payload.local_onion);
        println!("  Includes key: {}", if key.is_some() { "yes" } else { "no" });
        println!("  Format: {:?}", QrFormat::from_path(&self.output));

        Ok(())
    }
}
