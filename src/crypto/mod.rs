//! Cryptographic operations for leek.
//!
//! This module provides:
//! - Session key generation and persistence
//! - Symmetric authenticated encryption (ChaCha20Poly1305)

pub mod keys;
pub mod symmetric;

pub use keys::{
    load_key, load_or_create_key, save_key, KeyError, SessionKey, KEY_ENTRY, KEY_SIZE,
};
pub use symmetric::{open, seal, SymmetricError, NONCE_SIZE, TAG_SIZE};
