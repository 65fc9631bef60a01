//! Transport layer for outbound envelopes.
//!
//! This module defines the async transport trait and implementations for
//! the two ways a payload can reach the peer:
//! - [`ProxyTransport`]: through the local Tor SOCKS proxy to an onion address
//! - [`DirectTransport`]: plain TCP, for localhost testing

pub mod http;
mod tcp;
mod tor;

pub use http::{HttpError, Request, Response};
pub use tcp::DirectTransport;
pub use tor::ProxyTransport;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Errors that can occur while delivering a payload.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The whole exchange exceeded the per-request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The SOCKS proxy refused or failed the connection.
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Direct TCP connection failed.
    #[error("Connection failed: {0}")]
    Connect(#[source] std::io::Error),

    /// The HTTP exchange failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

/// Trait for posting one encoded envelope to the peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` and return the peer's response.
    async fn post(&self, body: &[u8], content_type: &str) -> Result<Response, TransportError>;

    /// Human-readable destination, used in log lines.
    fn destination(&self) -> &str;
}

/// Runs one request/response exchange on an established stream.
pub async fn exchange<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    host: &str,
    content_type: &str,
    body: &[u8],
) -> Result<Response, HttpError> {
    http::write_request(stream, host, content_type, body).await?;
    http::read_response(stream).await
}
