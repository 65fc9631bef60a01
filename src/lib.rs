//! # Leek - peer-to-peer messaging between onion services
//!
//! Two nodes, each running a Tor hidden service, exchange short JSON
//! envelopes over HTTP. Every node is both a listener (behind its hidden
//! service) and a sender (through the local Tor SOCKS proxy).
//!
//! ## Overview
//!
//! - Envelopes carry `sender`, `timestamp`, `type` and `content`
//! - Plaintext mode posts the JSON as is
//! - Encrypted mode seals it with ChaCha20-Poly1305 under a pre-shared key
//! - The listener answers 200 for valid envelopes and 400 with a fixed body
//!   otherwise
//! - Senders post each message once and never retry
//!
//! ## Example Usage
//!
//! ```rust
//! use leek::crypto::SessionKey;
//! use leek::message::{EncryptedCodec, Envelope, MessageCodec};
//!
//! let codec = EncryptedCodec::new(SessionKey::generate());
//! let sealed = codec.encode(&Envelope::text("abc.onion", "hi")).unwrap();
//! let opened = codec.decode(&sealed).unwrap();
//! assert_eq!(opened.describe(), "Message from abc.onion: hi");
//! ```
//!
//! ## Modules
//!
//! - [`crypto`]: Session key storage and the symmetric cipher
//! - [`message`]: Envelopes and the plain/encrypted codecs
//! - [`transport`]: HTTP framing and the proxy/direct transports
//! - [`listener`]: Inbound HTTP listener
//! - [`sender`]: Automatic and interactive senders
//! - [`session`]: Startup sequence tying it all together
//! - [`qr`]: Provisioning QR codes

pub mod address;
pub mod config;
pub mod crypto;
pub mod input;
pub mod listener;
pub mod logging;
pub mod message;
pub mod qr;
pub mod sender;
pub mod session;
pub mod transport;

// Re-export commonly used types at the crate root
pub use address::{AddressProvider, FixedAddress, HostnameFile, PeerAddress};
pub use config::{Encryption, FileConfig, Mode, SendMode, TransportConfig};
pub use crypto::{load_or_create_key, SessionKey};
pub use input::{LineSource, ScriptedLines, StdinLines};
pub use listener::{Listener, Outcome};
pub use message::{codec_for, Envelope, MessageCodec, MessageType, SharedCodec};
pub use sender::{AutoSender, Dispatcher, InteractiveSender, SendOutcome};
pub use session::{Session, SessionConfig, SessionError};
pub use transport::{DirectTransport, ProxyTransport, Transport};
