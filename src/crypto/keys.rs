//! Session key generation and storage.
//!
//! The session key is a 32-byte ChaCha20-Poly1305 key. It is generated once,
//! stored as a single `ENCRYPTION_KEY=<base64>` line and reused on every
//! later run that points at the same file. It is never rotated.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the session key in bytes.
pub const KEY_SIZE: usize = 32;

/// Name of the key entry in the storage file.
pub const KEY_ENTRY: &str = "ENCRYPTION_KEY";

/// Errors that can occur during key operations.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key file {path} has no ENCRYPTION_KEY entry")]
    MissingEntry { path: String },

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Cannot read key file {path}: {source}")]
    Unreadable { path: String, source: io::Error },

    #[error("Cannot write key file {path}: {source}")]
    Unwritable { path: String, source: io::Error },
}

/// The symmetric key shared by both peers for the lifetime of a session.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

impl SessionKey {
    /// Generates a new random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encodes the key as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Decodes a key from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut bytes = BASE64.decode(encoded.trim())?;

        if bytes.len() != KEY_SIZE {
            let got = bytes.len();
            bytes.zeroize();
            return Err(KeyError::InvalidKeyLength {
                expected: KEY_SIZE,
                got,
            });
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }
}

/// Loads the key stored at `path`, or creates and persists a new one.
pub fn load_or_create_key(path: &Path) -> Result<SessionKey, KeyError> {
    if path.exists() {
        let key = load_key(path)?;
        info!("Loaded encryption key from {}", path.display());
        return Ok(key);
    }

    let key = SessionKey::generate();
    save_key(path, &key)?;
    info!("Generated new encryption key at {}", path.display());
    Ok(key)
}

/// Loads the key stored at `path`. The file must exist.
pub fn load_key(path: &Path) -> Result<SessionKey, KeyError> {
    let content = fs::read_to_string(path).map_err(|source| KeyError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    let value = parse_key_entry(&content).ok_or_else(|| KeyError::MissingEntry {
        path: path.display().to_string(),
    })?;

    SessionKey::from_base64(value)
}

/// Writes `key` to `path` atomically.
///
/// The key is written to a temporary file in the same directory and renamed
/// over the target, so readers never observe a partial file.
pub fn save_key(path: &Path, key: &SessionKey) -> Result<(), KeyError> {
    let unwritable = |source: io::Error| KeyError::Unwritable {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(unwritable)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(unwritable)?;
    writeln!(tmp, "{}={}", KEY_ENTRY, key.to_base64()).map_err(unwritable)?;
    tmp.as_file().sync_all().map_err(unwritable)?;

    // Set restrictive permissions on the key file (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
            .map_err(unwritable)?;
    }

    tmp.persist(path).map_err(|e| unwritable(e.error))?;
    debug!("Persisted encryption key to {}", path.display());
    Ok(())
}

/// Finds the value of the `ENCRYPTION_KEY` entry, skipping blanks and comments.
fn parse_key_entry(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .find_map(|line| {
            let (name, value) = line.split_once('=')?;
            (name.trim() == KEY_ENTRY).then(|| value.trim())
        })
}
