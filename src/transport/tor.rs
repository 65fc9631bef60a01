//! Tor transport through the local SOCKS5 proxy.
//!
//! The onion hostname is handed to the proxy unresolved (socks5h), so name
//! resolution happens inside the Tor network.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_socks::tcp::Socks5Stream;

use super::{exchange, Response, Transport, TransportError};
use crate::address::PeerAddress;
use crate::config::{DEFAULT_PEER_PORT, DEFAULT_REQUEST_TIMEOUT};

/// Transport that reaches an onion address through a SOCKS5 proxy.
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    proxy: SocketAddr,
    peer: PeerAddress,
    port: u16,
    timeout: Duration,
}

impl ProxyTransport {
    /// Create a transport to `peer` on port 80 via `proxy`.
    pub fn new(proxy: SocketAddr, peer: PeerAddress) -> Self {
        Self {
            proxy,
            peer,
            port: DEFAULT_PEER_PORT,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the port the peer's hidden service exposes.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn post(&self, body: &[u8], content_type: &str) -> Result<Response, TransportError> {
        let attempt = async {
            let mut stream = Socks5Stream::connect(self.proxy, (self.peer.as_str(), self.port))
                .await
                .map_err(|e| TransportError::Proxy(e.to_string()))?;
            Ok::<_, TransportError>(
                exchange(&mut stream, self.peer.as_str(), content_type, body).await?,
            )
        };

        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }

    fn destination(&self) -> &str {
        self.peer.as_str()
    }
}
