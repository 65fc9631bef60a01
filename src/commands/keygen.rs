//! Session key command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use leek::crypto::load_or_create_key;

use super::{CommandExecutor, Settings};

/// Load the session key, creating it on first use.
#[derive(Args, Debug)]
pub struct KeygenCommand {
    /// Session key file
    #[arg(long, env = "LEEK_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Print the base64 key so it can be handed to the peer
    #[arg(long)]
    pub show: bool,
}

impl CommandExecutor for KeygenCommand {
    fn execute(&self, settings: &Settings) -> Result<()> {
        let path = settings.key_file(self.key_file.as_deref());
        let existed = path.exists();

        let key = load_or_create_key(&path)
            .with_context(|| format!("Failed to load session key from {}", path.display()))?;

        if existed {
            println!("Session key loaded: {}", path.display());
        } else {
            println!("Session key generated: {}", path.display());
        }

        if self.show {
            println!();
            println!("{}", key.to_base64());
            println!();
            println!("Anyone with this key can read and forge your messages.");
            println!("Share it with your peer over a channel you trust.");
        }

        Ok(())
    }
}
