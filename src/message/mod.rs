//! Envelopes and the codecs that put them on the wire.

mod codec;
mod envelope;

use std::sync::Arc;

pub use codec::{
    parse_envelope, DecodeError, EncodeError, EncryptedCodec, MessageCodec, PlainCodec,
    JSON_CONTENT_TYPE, OPAQUE_CONTENT_TYPE, REQUIRED_FIELDS,
};
pub use envelope::{utc_timestamp, Envelope, MessageType};

use crate::crypto::SessionKey;

/// Codec shared between the listener and sender of one session.
pub type SharedCodec = Arc<dyn MessageCodec>;

/// Selects the codec for a session: encrypted when a key is given.
pub fn codec_for(key: Option<SessionKey>) -> SharedCodec {
    match key {
        Some(key) => Arc::new(EncryptedCodec::new(key)),
        None => Arc::new(PlainCodec::new()),
    }
}
