//! Envelope encoding and decoding.
//!
//! A session picks one codec at startup and shares it between the listener
//! and the sender:
//! - [`PlainCodec`]: envelopes travel as JSON
//! - [`EncryptedCodec`]: JSON sealed with the session key (ChaCha20Poly1305)
//!
//! Decoding distinguishes three failure classes so the listener can answer
//! each one differently: the ciphertext did not open, the bytes were not
//! JSON, or the JSON was not an envelope.

use serde_json::{Map, Value};
use thiserror::Error;

use super::envelope::{Envelope, MessageType};
use crate::crypto::{open, seal, SessionKey, SymmetricError};

/// Fields every envelope must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["sender", "timestamp", "type", "content"];

/// Content type for plaintext envelopes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type for encrypted envelopes.
pub const OPAQUE_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors that can occur while decoding an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload failed authentication or could not be decrypted.
    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// The payload is not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// The payload is JSON but not a well-formed envelope.
    #[error("Invalid envelope format: {0}")]
    InvalidFormat(String),
}

/// Errors that can occur while encoding an envelope.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(#[from] SymmetricError),
}

/// Trait for turning envelopes into wire bytes and back.
pub trait MessageCodec: Send + Sync {
    /// Encode an envelope for transmission.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodeError>;

    /// Decode and validate a received payload.
    fn decode(&self, bytes: &[u8]) -> Result<Envelope, DecodeError>;

    /// HTTP content type of encoded payloads.
    fn content_type(&self) -> &'static str;

    /// Whether payloads are encrypted.
    fn is_encrypted(&self) -> bool;
}

/// JSON codec with no encryption.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl PlainCodec {
    /// Create a new plaintext codec.
    pub fn new() -> Self {
        Self
    }
}

impl MessageCodec for PlainCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(envelope)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, DecodeError> {
        parse_envelope(bytes)
    }

    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn is_encrypted(&self) -> bool {
        false
    }
}

/// JSON codec sealed with the session key.
#[derive(Debug, Clone)]
pub struct EncryptedCodec {
    key: SessionKey,
}

impl EncryptedCodec {
    /// Create a codec that seals and opens with `key`.
    pub fn new(key: SessionKey) -> Self {
        Self { key }
    }
}

impl MessageCodec for EncryptedCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
        let json = serde_json::to_vec(envelope)?;
        Ok(seal(&json, &self.key)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, DecodeError> {
        let json =
            open(bytes, &self.key).map_err(|e| DecodeError::InvalidCiphertext(e.to_string()))?;
        parse_envelope(&json)
    }

    fn content_type(&self) -> &'static str {
        OPAQUE_CONTENT_TYPE
    }

    fn is_encrypted(&self) -> bool {
        true
    }
}

/// Parses JSON bytes into an envelope, checking the required fields first.
///
/// Extra fields are ignored.
pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let Value::Object(map) = &value else {
        return Err(DecodeError::InvalidFormat(
            "expected a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !map.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(DecodeError::InvalidFormat(format!(
            "missing field(s): {}",
            missing.join(", ")
        )));
    }

    // Any type value is accepted; non-strings keep their JSON text
    let kind = match map.get("type").unwrap_or(&Value::Null) {
        Value::String(raw) => MessageType::from(raw.as_str()),
        other => MessageType::Unknown(other.to_string()),
    };

    Ok(Envelope {
        sender: string_field(map, "sender")?,
        timestamp: string_field(map, "timestamp")?,
        kind,
        content: string_field(map, "content")?,
    })
}

fn string_field(map: &Map<String, Value>, name: &str) -> Result<String, DecodeError> {
    match map.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(DecodeError::InvalidFormat(format!(
            "field '{}' must be a string",
            name
        ))),
    }
}
