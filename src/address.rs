//! Onion addresses: validating the peer and resolving our own.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Suffix every hidden-service address carries.
pub const ONION_SUFFIX: &str = ".onion";

/// Errors that can occur while handling addresses.
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Invalid onion address '{0}'. Please ensure it ends with '.onion'.")]
    InvalidPeer(String),

    #[error("Error reading local onion address from {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("Local onion address file {0} is empty")]
    Empty(String),
}

/// A validated remote hidden-service address (`<label>.onion`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Validates an operator-supplied address.
    ///
    /// Surrounding whitespace, an `http://` prefix and a trailing `/` are
    /// tolerated and stripped.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let host = trimmed.strip_prefix("http://").unwrap_or(trimmed);
        let host = host.strip_suffix('/').unwrap_or(host);

        match host.strip_suffix(ONION_SUFFIX) {
            // The address ends up in the Host header
            Some(label) if !label.is_empty() && label.chars().all(is_label_char) => {
                Ok(Self(host.to_string()))
            }
            _ => Err(AddressError::InvalidPeer(trimmed.to_string())),
        }
    }

    /// The address as a hostname.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of this node's own onion address.
pub trait AddressProvider {
    /// Returns the local hidden-service address.
    fn local_address(&self) -> Result<String, AddressError>;
}

impl<P: AddressProvider + ?Sized> AddressProvider for Box<P> {
    fn local_address(&self) -> Result<String, AddressError> {
        (**self).local_address()
    }
}

/// Reads the address from the `hostname` file Tor writes for a hidden service.
#[derive(Debug, Clone)]
pub struct HostnameFile {
    path: PathBuf,
}

impl HostnameFile {
    /// Create a provider for the given hostname file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the hostname file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AddressProvider for HostnameFile {
    fn local_address(&self) -> Result<String, AddressError> {
        let content = fs::read_to_string(&self.path).map_err(|source| AddressError::Unreadable {
            path: self.path.display().to_string(),
            source,
        })?;

        let address = content.trim();
        if address.is_empty() {
            return Err(AddressError::Empty(self.path.display().to_string()));
        }
        Ok(address.to_string())
    }
}

/// A fixed address, for tests and `--local-address` overrides.
#[derive(Debug, Clone)]
pub struct FixedAddress(pub String);

impl AddressProvider for FixedAddress {
    fn local_address(&self) -> Result<String, AddressError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_valid_peer() {
        let peer = PeerAddress::parse("abc123.onion").unwrap();
        assert_eq!(peer.as_str(), "abc123.onion");
    }

    #[test]
    fn test_peer_normalization() {
        let peer = PeerAddress::parse("  http://abc123.onion/ \n").unwrap();
        assert_eq!(peer.to_string(), "abc123.onion");
    }

    #[test]
    fn test_invalid_peers() {
        for input in ["", "abc123", "abc123.com", ".onion", "abc.onion.com", "a b.onion"] {
            assert!(
                PeerAddress::parse(input).is_err(),
                "'{}' should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_control_characters_rejected() {
        for input in [
            "abc\r\nX-Injected: 1.onion",
            "abc\n.onion",
            "ab\tc.onion",
            "abc\0.onion",
        ] {
            assert!(
                PeerAddress::parse(input).is_err(),
                "{:?} should be rejected",
                input
            );
        }
        assert!(PeerAddress::parse("sub.abc-123.onion").is_ok());
    }

    #[test]
    fn test_hostname_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hostname");
        fs::write(&path, "localaddr.onion\n").unwrap();

        let provider = HostnameFile::new(&path);
        assert_eq!(provider.local_address().unwrap(), "localaddr.onion");
    }

    #[test]
    fn test_hostname_file_missing() {
        let dir = tempdir().unwrap();
        let provider = HostnameFile::new(dir.path().join("absent"));
        assert!(matches!(
            provider.local_address(),
            Err(AddressError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_hostname_file_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hostname");
        fs::write(&path, "  \n").unwrap();

        assert!(matches!(
            HostnameFile::new(&path).local_address(),
            Err(AddressError::Empty(_))
        ));
    }
}
