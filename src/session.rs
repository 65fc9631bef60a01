//! Session controller.
//!
//! Wires one chat session together: resolves both addresses, settles the
//! mode, loads the key when encrypting, starts the listener in the
//! background and then hands the foreground to the chosen sender.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::address::{AddressError, AddressProvider, PeerAddress};
use crate::config::{ConfigError, Encryption, Mode, SendMode, TransportConfig};
use crate::crypto::{load_or_create_key, KeyError};
use crate::input::LineSource;
use crate::listener::{Listener, ListenerError};
use crate::message::{codec_for, SharedCodec};
use crate::qr::{write_provisioning_qr, ProvisioningPayload, QrError};
use crate::sender::{AutoSender, Dispatcher, InteractiveSender};
use crate::transport::{DirectTransport, ProxyTransport, Transport};

const PEER_PROMPT: &str = "Enter the remote onion address (without 'http://'): ";
const MODE_PROMPT: &str = "Choose message sending mode:\n1. Automatic (send every second)\n2. Manual (send custom messages)\nEnter 1 or 2: ";
const ENCRYPTION_PROMPT: &str = "Enable end-to-end encryption? (y/n): ";

/// Errors that abort session startup.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    LocalAddress(#[source] AddressError),

    #[error("{0}")]
    InvalidPeerAddress(#[source] AddressError),

    #[error("Key storage error: {0}")]
    Key(#[from] KeyError),

    #[error("Invalid choice '{0}'")]
    InvalidMode(String),

    #[error("{0}")]
    Bind(#[from] ListenerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write provisioning QR code: {0}")]
    Qr(#[from] QrError),

    #[error("Input closed before {0} was given")]
    InputClosed(&'static str),

    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Everything a session needs that is not asked interactively.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Network settings.
    pub transport: TransportConfig,
    /// Session key storage.
    pub key_file: PathBuf,
    /// Peer address; prompted for when absent.
    pub peer: Option<String>,
    /// Sending mode; prompted for when absent.
    pub send_mode: Option<SendMode>,
    /// Encryption choice; prompted for when absent.
    pub encryption: Option<Encryption>,
    /// Where to write the provisioning QR code, if anywhere.
    pub qr_output: Option<PathBuf>,
    /// Post straight to this `host:port` instead of through the proxy.
    pub direct: Option<String>,
}

impl SessionConfig {
    /// A config with the given transport and key file, asking for the rest.
    pub fn new(transport: TransportConfig, key_file: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            key_file: key_file.into(),
            peer: None,
            send_mode: None,
            encryption: None,
            qr_output: None,
            direct: None,
        }
    }
}

/// A session whose setup is complete: the listener is bound but idle.
pub struct PreparedSession {
    pub local_address: String,
    pub peer: PeerAddress,
    pub mode: Mode,
    pub codec: SharedCodec,
    listener: Listener,
    dispatcher: Dispatcher,
    send_interval: std::time::Duration,
}

impl PreparedSession {
    /// Address the listener is bound to.
    pub fn listen_addr(&self) -> Result<std::net::SocketAddr, ListenerError> {
        self.listener.local_addr()
    }

    /// Start the listener on a background task.
    pub fn start_listener(self) -> (RunningSession, JoinHandle<()>) {
        let handle = self.listener.spawn();
        let running = RunningSession {
            mode: self.mode,
            dispatcher: self.dispatcher,
            send_interval: self.send_interval,
        };
        (running, handle)
    }
}

/// A session with its listener running, ready to send.
pub struct RunningSession {
    mode: Mode,
    dispatcher: Dispatcher,
    send_interval: std::time::Duration,
}

impl RunningSession {
    /// Run the selected sender until it finishes.
    ///
    /// The automatic sender never finishes on its own.
    pub async fn send<L: LineSource + ?Sized>(self, input: &mut L) -> Result<(), SessionError> {
        match self.mode.send {
            SendMode::Automatic => {
                AutoSender::new(self.dispatcher)
                    .with_interval(self.send_interval)
                    .run()
                    .await;
                Ok(())
            }
            SendMode::Manual => {
                InteractiveSender::new(self.dispatcher).run(input).await?;
                Ok(())
            }
        }
    }
}

/// Drives one chat session.
pub struct Session {
    config: SessionConfig,
    address: Box<dyn AddressProvider + Send + Sync>,
}

impl Session {
    /// Create a session resolving our address through `address`.
    pub fn new(config: SessionConfig, address: impl AddressProvider + Send + Sync + 'static) -> Self {
        Self {
            config,
            address: Box::new(address),
        }
    }

    /// Perform every startup step up to and including binding the listener.
    pub async fn prepare<L: LineSource + ?Sized>(
        &self,
        input: &mut L,
    ) -> Result<PreparedSession, SessionError> {
        let local_address = self
            .address
            .local_address()
            .map_err(SessionError::LocalAddress)?;
        println!("Your local onion address is: {}", local_address);
        info!("Local onion address: {}", local_address);

        let peer = self.resolve_peer(input).await?;
        let mode = self.resolve_mode(input).await?;
        info!("Remote onion address: {}, mode: {}", peer, mode);

        let key = match mode.encryption {
            Encryption::Encrypted => Some(load_or_create_key(&self.config.key_file)?),
            Encryption::Plaintext => None,
        };

        if let Some(path) = &self.config.qr_output {
            let payload = ProvisioningPayload::new(local_address.as_str(), key.as_ref());
            write_provisioning_qr(&payload, path)?;
            println!("Provisioning QR code written to {}", path.display());
            info!("Provisioning QR code written to {}", path.display());
        }

        let codec = codec_for(key);
        let listener = Listener::bind(self.config.transport.listen_addr, codec.clone())
            .await?
            .with_timeout(self.config.transport.request_timeout);
        let bound = listener.local_addr()?;
        println!(
            "Server started on port {}, waiting for incoming messages...",
            bound.port()
        );

        let dispatcher = Dispatcher::new(
            codec.clone(),
            self.transport_for(&peer),
            local_address.as_str(),
        );

        Ok(PreparedSession {
            local_address,
            peer,
            mode,
            codec,
            listener,
            dispatcher,
            send_interval: self.config.transport.send_interval,
        })
    }

    /// Run the whole session until the sender exits or Ctrl-C.
    pub async fn run<L: LineSource + ?Sized>(&self, input: &mut L) -> Result<(), SessionError> {
        let prepared = self.prepare(input).await?;
        let (running, listener) = prepared.start_listener();

        let result = tokio::select! {
            result = running.send(input) => result,
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Interrupted, shutting down"),
                    Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                }
                Ok(())
            }
        };

        listener.abort();
        result
    }

    fn transport_for(&self, peer: &PeerAddress) -> Arc<dyn Transport> {
        let transport = &self.config.transport;
        match &self.config.direct {
            Some(addr) => Arc::new(
                DirectTransport::new(addr.clone()).with_timeout(transport.request_timeout),
            ),
            None => Arc::new(
                ProxyTransport::new(transport.proxy_addr, peer.clone())
                    .with_port(transport.peer_port)
                    .with_timeout(transport.request_timeout),
            ),
        }
    }

    async fn resolve_peer<L: LineSource + ?Sized>(
        &self,
        input: &mut L,
    ) -> Result<PeerAddress, SessionError> {
        let raw = match &self.config.peer {
            Some(peer) => peer.clone(),
            None => ask(input, PEER_PROMPT, "the remote onion address").await?,
        };

        PeerAddress::parse(&raw).map_err(|e| {
            error!("Invalid remote onion address entered: {}", raw.trim());
            SessionError::InvalidPeerAddress(e)
        })
    }

    async fn resolve_mode<L: LineSource + ?Sized>(&self, input: &mut L) -> Result<Mode, SessionError> {
        let send = match self.config.send_mode {
            Some(send) => send,
            None => {
                let answer = ask(input, MODE_PROMPT, "a messaging mode").await?;
                match answer.trim() {
                    "1" => SendMode::Automatic,
                    "2" => SendMode::Manual,
                    other => {
                        error!("Invalid messaging mode selected: {}", other);
                        return Err(SessionError::InvalidMode(other.to_string()));
                    }
                }
            }
        };

        let encryption = match self.config.encryption {
            Some(encryption) => encryption,
            None => {
                let answer = ask(input, ENCRYPTION_PROMPT, "an encryption choice").await?;
                Encryption::from_answer(&answer).map_err(|_| {
                    error!("Invalid encryption choice: {}", answer.trim());
                    SessionError::InvalidMode(answer.trim().to_string())
                })?
            }
        };

        Ok(Mode { encryption, send })
    }
}

async fn ask<L: LineSource + ?Sized>(
    input: &mut L,
    prompt: &str,
    what: &'static str,
) -> Result<String, SessionError> {
    input
        .next_line(prompt)
        .await?
        .ok_or(SessionError::InputClosed(what))
}
