//! Outbound senders.
//!
//! Both senders build an envelope, encode it with the session codec and post
//! it once through the transport. Failed sends are logged and dropped: no
//! retry, no queue. The message counter advances on every attempt, so gaps
//! in the peer's view of the sequence are expected.

mod auto;
mod interactive;

pub use auto::AutoSender;
pub use interactive::{InteractiveSender, EXIT_COMMAND};

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::message::{EncodeError, Envelope, SharedCodec};
use crate::transport::{Transport, TransportError};

/// Errors that prevent a send from reaching the peer.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("{0}")]
    Transport(#[from] TransportError),
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub enum SendOutcome {
    /// The peer answered 200.
    Delivered,
    /// The peer answered with another status.
    Refused { status: u16, body: String },
    /// The request never completed.
    Failed(SendError),
}

impl SendOutcome {
    /// Returns true if the peer acknowledged the message.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Encodes envelopes and posts them to the peer.
#[derive(Clone)]
pub struct Dispatcher {
    codec: SharedCodec,
    transport: Arc<dyn Transport>,
    local_address: String,
}

impl Dispatcher {
    /// Create a dispatcher sending as `local_address`.
    pub fn new(
        codec: SharedCodec,
        transport: Arc<dyn Transport>,
        local_address: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            transport,
            local_address: local_address.into(),
        }
    }

    /// Our own onion address, used as the envelope sender.
    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    /// Where messages go.
    pub fn destination(&self) -> &str {
        self.transport.destination()
    }

    /// Build, encode and post a `text` envelope, then report the result.
    pub async fn send_text(&self, seq: u64, content: &str) -> SendOutcome {
        let envelope = Envelope::text(self.local_address.as_str(), content);
        let outcome = self.deliver(&envelope).await;
        self.report(seq, &envelope, &outcome);
        outcome
    }

    /// Encode and post one envelope.
    pub async fn deliver(&self, envelope: &Envelope) -> SendOutcome {
        let body = match self.codec.encode(envelope) {
            Ok(body) => body,
            Err(e) => return SendOutcome::Failed(e.into()),
        };

        match self.transport.post(&body, self.codec.content_type()).await {
            Ok(response) if response.is_ok() => SendOutcome::Delivered,
            Ok(response) => SendOutcome::Refused {
                status: response.status,
                body: response.text(),
            },
            Err(e) => SendOutcome::Failed(e.into()),
        }
    }

    fn report(&self, seq: u64, envelope: &Envelope, outcome: &SendOutcome) {
        let peer = self.destination();
        match outcome {
            SendOutcome::Delivered => {
                let line = format!("Sent message {} to {}: {}", seq, peer, envelope.content);
                println!("{}", line);
                info!("{}", line);
            }
            SendOutcome::Refused { status, body } => {
                let line = format!("Failed to send message {} to {}: {}", seq, peer, body);
                println!("{}", line);
                warn!(status = *status, "{}", line);
            }
            SendOutcome::Failed(e) => {
                let line = format!("Error sending message to {}: {}", peer, e);
                println!("{}", line);
                error!("{}", line);
            }
        }
    }
}
