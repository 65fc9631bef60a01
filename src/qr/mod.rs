//! Provisioning QR codes.
//!
//! The peer scans a code carrying our onion address and, in encrypted mode,
//! the base64 session key. The payload is a small JSON object:
//! `{"local_onion": "...", "encryption_key": "..."}`.

mod generator;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use generator::{generate_qr, generate_qr_to_file, QrConfig, QrError, QrFormat, QrOutput};

use crate::crypto::SessionKey;

/// What a provisioning code tells the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningPayload {
    /// Our onion address.
    pub local_onion: String,
    /// Base64 session key. Absent in plaintext mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl ProvisioningPayload {
    /// Build a payload, including the key when one is given.
    pub fn new(local_onion: impl Into<String>, key: Option<&SessionKey>) -> Self {
        Self {
            local_onion: local_onion.into(),
            encryption_key: key.map(SessionKey::to_base64),
        }
    }

    /// JSON text stored in the QR code.
    pub fn to_json(&self) -> Result<String, QrError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Write `payload` to `path` as a QR code, format chosen from the extension.
pub fn write_provisioning_qr(payload: &ProvisioningPayload, path: &Path) -> Result<(), QrError> {
    let config = QrConfig {
        format: QrFormat::from_path(path),
        ..Default::default()
    };
    generate_qr_to_file(&payload.to_json()?, path, &config)
}
