//! Direct TCP transport.
//!
//! Posts straight to a socket address without the proxy. Used for localhost
//! testing of two sessions on one machine.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{exchange, Response, Transport, TransportError};
use crate::config::DEFAULT_REQUEST_TIMEOUT;

/// Transport that connects directly to `addr`.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    addr: String,
    timeout: Duration,
}

impl DirectTransport {
    /// Create a transport for `addr` (e.g. `127.0.0.1:8081`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn post(&self, body: &[u8], content_type: &str) -> Result<Response, TransportError> {
        let attempt = async {
            let mut stream = TcpStream::connect(&self.addr)
                .await
                .map_err(TransportError::Connect)?;
            Ok::<_, TransportError>(exchange(&mut stream, &self.addr, content_type, body).await?)
        };

        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }

    fn destination(&self) -> &str {
        &self.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::http;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_direct_post() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = http::read_request(&mut stream).await.unwrap();
            assert_eq!(request.body, b"payload");
            http::write_response(&mut stream, 200, b"OK").await.unwrap();
        });

        let transport = DirectTransport::new(addr.to_string());
        let response = transport.post(b"payload", "text/plain").await.unwrap();
        assert!(response.is_ok());
        assert_eq!(response.text(), "OK");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = DirectTransport::new(addr.to_string());
        let result = transport.post(b"x", "text/plain").await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept but never answer
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport =
            DirectTransport::new(addr.to_string()).with_timeout(Duration::from_millis(100));
        let result = transport.post(b"x", "text/plain").await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));

        server.abort();
    }
}
