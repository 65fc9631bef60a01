//! Command module - Strategy pattern for CLI commands.
//!
//! Each command is a separate module implementing the `CommandExecutor` trait.

mod chat;
mod keygen;
mod provision;

pub use chat::ChatCommand;
pub use keygen::KeygenCommand;
pub use provision::ProvisionCommand;

use std::path::{Path, PathBuf};

use anyhow::Result;

use leek::address::{AddressProvider, FixedAddress, HostnameFile};
use leek::config::{default_hostname_file, default_key_file, FileConfig};

/// Settings shared by all commands: the loaded config file.
///
/// Command-line flags win over the file, which wins over built-in defaults.
pub struct Settings {
    pub file: FileConfig,
}

impl Settings {
    pub fn new(file: FileConfig) -> Self {
        Self { file }
    }

    /// Session key storage.
    pub fn key_file(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.file.key_file.clone())
            .unwrap_or_else(default_key_file)
    }

    /// Tor hidden service hostname file.
    pub fn hostname_file(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.file.hostname_file.clone())
            .unwrap_or_else(default_hostname_file)
    }

    /// Provider for our own onion address: a fixed override or the hostname file.
    pub fn address_provider(
        &self,
        fixed: Option<&str>,
        hostname_file: Option<&Path>,
    ) -> Box<dyn AddressProvider + Send + Sync> {
        match fixed {
            Some(address) => Box::new(FixedAddress(address.to_string())),
            None => Box::new(HostnameFile::new(self.hostname_file(hostname_file))),
        }
    }
}

/// Trait for command execution - Strategy pattern.
///
/// Each command struct holds its parsed arguments and implements
/// this trait to define its execution logic.
pub trait CommandExecutor {
    /// Executes the command with its parsed arguments.
    fn execute(&self, settings: &Settings) -> Result<()>;
}
