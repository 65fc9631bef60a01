//! Inbound listener.
//!
//! Accepts HTTP connections from the hidden service, decodes each posted
//! envelope with the session codec and answers with a fixed status and body.
//! Every connection runs on its own task; the only shared state is the
//! immutable codec.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::message::{DecodeError, Envelope, MessageCodec, MessageType, SharedCodec};
use crate::transport::http::{self, Request};

/// Body sent with 200.
pub const OK_BODY: &str = "OK";
/// Body sent when the envelope is missing fields or malformed.
pub const INVALID_FORMAT_BODY: &str = "Invalid message format.";
/// Body sent when the payload is not JSON.
pub const INVALID_JSON_BODY: &str = "Invalid JSON format.";
/// Body sent when the payload fails decryption.
pub const INVALID_CIPHERTEXT_BODY: &str = "Invalid encrypted message or decryption failed.";
/// Body sent for any other fault.
pub const INTERNAL_ERROR_BODY: &str = "Internal server error.";
/// Body sent for methods other than POST.
pub const UNSUPPORTED_METHOD_BODY: &str = "Unsupported method.";

/// Errors raised by the listener itself (not by a request).
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] http::HttpError),
}

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A valid envelope was received.
    Accepted(Envelope),
    /// The payload was rejected by the codec.
    Rejected(DecodeError),
    /// The request used a method other than POST.
    UnsupportedMethod(String),
    /// Anything else went wrong while handling the request.
    Failed(String),
}

impl Outcome {
    /// HTTP status for this outcome.
    pub fn status(&self) -> u16 {
        match self {
            Self::Accepted(_) => 200,
            Self::Rejected(_) => 400,
            Self::UnsupportedMethod(_) => 501,
            Self::Failed(_) => 500,
        }
    }

    /// Response body for this outcome.
    pub fn body(&self) -> &'static str {
        match self {
            Self::Accepted(_) => OK_BODY,
            Self::Rejected(DecodeError::InvalidFormat(_)) => INVALID_FORMAT_BODY,
            Self::Rejected(DecodeError::InvalidJson(_)) => INVALID_JSON_BODY,
            Self::Rejected(DecodeError::InvalidCiphertext(_)) => INVALID_CIPHERTEXT_BODY,
            Self::UnsupportedMethod(_) => UNSUPPORTED_METHOD_BODY,
            Self::Failed(_) => INTERNAL_ERROR_BODY,
        }
    }

    /// Log the outcome and show received messages to the operator.
    fn report(&self, peer: &str) {
        match self {
            Self::Accepted(envelope) => {
                let line = envelope.describe();
                println!("\n[{}] {}", envelope.timestamp, line);
                match envelope.kind {
                    // Commands are recognized but never executed
                    MessageType::Text | MessageType::Command => info!("{}", line),
                    MessageType::Unknown(_) => warn!("{}", line),
                }
            }
            Self::Rejected(DecodeError::InvalidFormat(detail)) => {
                warn!("Received message with invalid format from {}: {}", peer, detail)
            }
            Self::Rejected(DecodeError::InvalidJson(detail)) => {
                error!("Received message with invalid JSON format from {}: {}", peer, detail)
            }
            Self::Rejected(DecodeError::InvalidCiphertext(detail)) => error!(
                "Received invalid encrypted message from {} or decryption failed: {}",
                peer, detail
            ),
            Self::UnsupportedMethod(method) => {
                warn!("Rejected {} request from {}", method, peer)
            }
            Self::Failed(detail) => error!("Error processing incoming message: {}", detail),
        }
    }
}

/// Decide the outcome of one parsed request.
pub fn evaluate(codec: &dyn MessageCodec, request: &Request) -> Outcome {
    if !request.method.eq_ignore_ascii_case("POST") {
        return Outcome::UnsupportedMethod(request.method.clone());
    }

    match codec.decode(&request.body) {
        Ok(envelope) => Outcome::Accepted(envelope),
        Err(e) => Outcome::Rejected(e),
    }
}

/// A bound inbound listener.
pub struct Listener {
    listener: TcpListener,
    codec: SharedCodec,
    request_timeout: Duration,
}

impl Listener {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, codec: SharedCodec) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            codec,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Limit how long a client may take to send its request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(
                "Server started on {} ({} mode).",
                addr,
                if self.codec.is_encrypted() {
                    "encrypted"
                } else {
                    "plaintext"
                }
            );
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let codec = self.codec.clone();
                    let timeout = self.request_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, codec, timeout).await {
                            debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                Err(e) => error!("Failed to accept connection: {}", e),
            }
        }
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Serve exactly one request on `stream`.
///
/// A request that has not fully arrived within `timeout` is answered with 500.
pub async fn handle_connection(
    mut stream: TcpStream,
    codec: SharedCodec,
    timeout: Duration,
) -> Result<Outcome, ListenerError> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let outcome = match tokio::time::timeout(timeout, http::read_request(&mut stream)).await {
        Ok(Ok(request)) => evaluate(codec.as_ref(), &request),
        Ok(Err(e)) => Outcome::Failed(e.to_string()),
        Err(_) => Outcome::Failed(format!("request not received within {:?}", timeout)),
    };
    outcome.report(&peer);

    http::write_response(&mut stream, outcome.status(), outcome.body().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SessionKey;
    use crate::message::{EncryptedCodec, PlainCodec};
    use crate::transport::{DirectTransport, Transport};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    fn post(body: &[u8]) -> Request {
        Request {
            method: "POST".to_string(),
            path: "/".to_string(),
            headers: vec![],
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_valid_text() {
        let body = br#"{"sender":"abc.onion","timestamp":"2024-01-01T00:00:00Z","type":"text","content":"hi"}"#;
        let outcome = evaluate(&PlainCodec::new(), &post(body));
        assert_eq!(outcome.status(), 200);
        assert_eq!(outcome.body(), "OK");
        match outcome {
            Outcome::Accepted(envelope) => {
                assert_eq!(envelope.describe(), "Message from abc.onion: hi")
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_acknowledged() {
        let body = br#"{"sender":"a","timestamp":"t","type":"ping","content":"c"}"#;
        let outcome = evaluate(&PlainCodec::new(), &post(body));
        assert_eq!(outcome.status(), 200);
        assert_eq!(outcome.body(), OK_BODY);
    }

    #[test]
    fn test_non_string_type_is_acknowledged() {
        for body in [
            &br#"{"sender":"a","timestamp":"t","type":5,"content":"c"}"#[..],
            &br#"{"sender":"a","timestamp":"t","type":null,"content":"c"}"#[..],
        ] {
            let outcome = evaluate(&PlainCodec::new(), &post(body));
            assert_eq!(outcome.status(), 200);
            assert_eq!(outcome.body(), OK_BODY);
            assert!(matches!(outcome, Outcome::Accepted(e) if e.kind.is_unknown()));
        }
    }

    #[test]
    fn test_missing_field() {
        let body = br#"{"sender":"a","timestamp":"t","content":"c"}"#;
        let outcome = evaluate(&PlainCodec::new(), &post(body));
        assert_eq!(outcome.status(), 400);
        assert_eq!(outcome.body(), "Invalid message format.");
    }

    #[test]
    fn test_invalid_json() {
        let outcome = evaluate(&PlainCodec::new(), &post(b"hello there"));
        assert_eq!(outcome.status(), 400);
        assert_eq!(outcome.body(), "Invalid JSON format.");
    }

    #[test]
    fn test_invalid_ciphertext() {
        let codec = EncryptedCodec::new(SessionKey::generate());
        let outcome = evaluate(&codec, &post(b"{\"sender\":\"a\"}"));
        assert_eq!(outcome.status(), 400);
        assert_eq!(
            outcome.body(),
            "Invalid encrypted message or decryption failed."
        );
    }

    #[test]
    fn test_unsupported_method() {
        let mut request = post(b"");
        request.method = "GET".to_string();
        let outcome = evaluate(&PlainCodec::new(), &request);
        assert_eq!(outcome.status(), 501);
        assert_eq!(outcome.body(), UNSUPPORTED_METHOD_BODY);
    }

    #[test]
    fn test_failed_is_internal_error() {
        let outcome = Outcome::Failed("boom".to_string());
        assert_eq!(outcome.status(), 500);
        assert_eq!(outcome.body(), "Internal server error.");
    }

    #[tokio::test]
    async fn test_listener_serves_over_socket() {
        let codec: SharedCodec = Arc::new(PlainCodec::new());
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), codec)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = listener.spawn();

        let transport = DirectTransport::new(addr.to_string());
        let body = br#"{"sender":"a.onion","timestamp":"t","type":"command","content":"ls"}"#;
        let response = transport.post(body, "application/json").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "OK");

        let response = transport.post(b"{oops", "application/json").await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(response.text(), INVALID_JSON_BODY);

        handle.abort();
    }

    #[tokio::test]
    async fn test_stalled_request_times_out() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n")
            .await
            .unwrap();

        let (stream, _) = server.accept().await.unwrap();
        let codec: SharedCodec = Arc::new(PlainCodec::new());
        let outcome = handle_connection(stream, codec, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(outcome.status(), 500);

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 500"));
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let codec: SharedCodec = Arc::new(PlainCodec::new());
        let first = Listener::bind("127.0.0.1:0".parse().unwrap(), codec.clone())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let second = Listener::bind(addr, codec).await;
        assert!(matches!(second, Err(ListenerError::Bind { .. })));
    }
}
