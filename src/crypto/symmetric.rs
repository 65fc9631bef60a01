//! Symmetric authenticated encryption with the session key.
//!
//! ChaCha20-Poly1305 with a fresh random nonce for every sealed message.
//! The output format is: nonce (12 bytes) || ciphertext (includes 16-byte tag).

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use super::keys::SessionKey;

/// Nonce size for ChaCha20Poly1305.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size.
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during symmetric encryption.
#[derive(Error, Debug)]
pub enum SymmetricError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    #[error("Invalid ciphertext: too short ({0} bytes)")]
    CiphertextTooShort(usize),
}

/// Encrypts `plaintext` under `key` with a freshly generated nonce.
pub fn seal(plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>, SymmetricError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| SymmetricError::EncryptionFailed)?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypts data produced by [`seal`].
pub fn open(data: &[u8], key: &SessionKey) -> Result<Vec<u8>, SymmetricError> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SymmetricError::CiphertextTooShort(data.len()));
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| SymmetricError::DecryptionFailed)
}
