//! Session configuration.
//!
//! Settings come from three layers, later ones winning:
//! built-in defaults, an optional TOML file (`~/.config/leek/config.toml`),
//! and command-line flags.

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default listener bind address. Must match the hidden service's target port.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default Tor SOCKS proxy.
pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:9050";

/// Port the peer's hidden service exposes.
pub const DEFAULT_PEER_PORT: u16 = 80;

/// Upper bound on one outbound request, connect included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between automatic sends.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Invalid socket address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid messaging mode '{0}'")]
    InvalidMode(String),
}

/// How outbound messages are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// Send a numbered message every interval.
    Automatic,
    /// Send each line the operator types.
    Manual,
}

impl FromStr for SendMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "auto" | "automatic" => Ok(Self::Automatic),
            "2" | "manual" => Ok(Self::Manual),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for SendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => f.write_str("automatic"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Whether envelopes are sealed with the session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Plaintext,
    Encrypted,
}

impl Encryption {
    /// Parses a yes/no answer.
    pub fn from_answer(answer: &str) -> Result<Self, ConfigError> {
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(Self::Encrypted),
            "n" | "no" => Ok(Self::Plaintext),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext => f.write_str("plaintext"),
            Self::Encrypted => f.write_str("encrypted"),
        }
    }
}

/// One of the four session modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub encryption: Encryption,
    pub send: SendMode,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.encryption, self.send)
    }
}

/// Network settings shared by the listener and the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Where the inbound listener binds.
    pub listen_addr: SocketAddr,
    /// Local SOCKS5 proxy.
    pub proxy_addr: SocketAddr,
    /// Port of the peer's hidden service.
    pub peer_port: u16,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Pause between automatic sends.
    pub send_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            proxy_addr: SocketAddr::from(([127, 0, 0, 1], 9050)),
            peer_port: DEFAULT_PEER_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            send_interval: DEFAULT_SEND_INTERVAL,
        }
    }
}

/// Contents of the optional TOML config file. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tor hidden service `hostname` file.
    pub hostname_file: Option<PathBuf>,
    /// Session key storage.
    pub key_file: Option<PathBuf>,
    /// Append-only log file.
    pub log_file: Option<PathBuf>,
    /// Listener bind address.
    pub listen_addr: Option<String>,
    /// SOCKS proxy address.
    pub proxy_addr: Option<String>,
    /// Peer hidden service port.
    pub peer_port: Option<u16>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Automatic send interval in milliseconds.
    pub send_interval_ms: Option<u64>,
    /// Where to write the provisioning QR image.
    pub qr_output: Option<PathBuf>,
}

impl FileConfig {
    /// Load the config file.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present and an empty config is returned otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Transport settings with this file's overrides applied to the defaults.
    pub fn transport(&self) -> Result<TransportConfig, ConfigError> {
        let mut config = TransportConfig::default();
        if let Some(addr) = &self.listen_addr {
            config.listen_addr = parse_socket_addr(addr)?;
        }
        if let Some(addr) = &self.proxy_addr {
            config.proxy_addr = parse_socket_addr(addr)?;
        }
        if let Some(port) = self.peer_port {
            config.peer_port = port;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.send_interval_ms {
            config.send_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

/// Parses `host:port` into a socket address.
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidAddress(addr.to_string()))
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join("leek")
}

/// `~/.config/leek/config.toml` (platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("leek").join("config.toml"))
}

/// `~/hidden_service_hostname`.
pub fn default_hostname_file() -> PathBuf {
    home_dir().join("hidden_service_hostname")
}

/// `~/.config/leek/session.env`.
pub fn default_key_file() -> PathBuf {
    config_dir().join("session.env")
}

/// `~/leek_messaging.log`.
pub fn default_log_file() -> PathBuf {
    home_dir().join("leek_messaging.log")
}
