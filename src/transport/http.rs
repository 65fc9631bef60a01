//! Minimal HTTP/1.1 framing over async byte streams.
//!
//! Only what the message exchange needs: one request and one response per
//! connection, bodies delimited by `Content-Length`, `Connection: close`.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted request or response head.
pub const MAX_HEAD_SIZE: usize = 16 * 1024;

/// Largest accepted body (1 MiB).
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

const MAX_HEADERS: usize = 32;

/// Errors that can occur while reading or writing HTTP messages.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed HTTP message: {0}")]
    Malformed(String),

    #[error("Connection closed before the message was complete")]
    Incomplete,

    #[error("HTTP head too large (max {max} bytes)")]
    HeadTooLarge { max: usize },

    #[error("Body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("Invalid Content-Length header")]
    InvalidContentLength,
}

/// A received HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method (e.g. `POST`).
    pub method: String,
    /// Request target.
    pub path: String,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

impl Request {
    /// Returns the first header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Returns true for status 200.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The body as text (lossy UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Standard reason phrase for the status codes this crate emits.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "Unknown",
    }
}

/// Write a `POST /` request with the given body.
pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    host: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), HttpError> {
    let head = format!(
        "POST / HTTP/1.1\r\nHost: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        host,
        content_type,
        body.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Write a complete response with a plain-text body.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: u16,
    body: &[u8],
) -> Result<(), HttpError> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason_phrase(status),
        body.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one request. A missing `Content-Length` means an empty body.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, HttpError> {
    let mut buf = read_head(reader).await?;

    let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut raw_headers);
    let head_len = match parsed.parse(&buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Err(HttpError::Incomplete),
        Err(e) => return Err(HttpError::Malformed(e.to_string())),
    };

    let method = parsed.method.unwrap_or_default().to_string();
    let path = parsed.path.unwrap_or("/").to_string();
    let headers = owned_headers(parsed.headers);

    let body_len = content_length(&headers)?.unwrap_or(0);
    let body = read_body(reader, buf.split_off(head_len), Some(body_len)).await?;

    Ok(Request {
        method,
        path,
        headers,
        body,
    })
}

/// Read one response. Without `Content-Length` the body runs to end of stream.
pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Response, HttpError> {
    let mut buf = read_head(reader).await?;

    let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut raw_headers);
    let head_len = match parsed.parse(&buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Err(HttpError::Incomplete),
        Err(e) => return Err(HttpError::Malformed(e.to_string())),
    };

    let status = parsed
        .code
        .ok_or_else(|| HttpError::Malformed("missing status code".to_string()))?;
    let headers = owned_headers(parsed.headers);

    let body_len = content_length(&headers)?;
    let body = read_body(reader, buf.split_off(head_len), body_len).await?;

    Ok(Response { status, body })
}

/// Reads until the blank line that ends the head. May over-read into the body.
async fn read_head<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, HttpError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(HttpError::Incomplete);
        }
        buf.extend_from_slice(&chunk[..n]);

        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(buf);
        }
        if buf.len() > MAX_HEAD_SIZE {
            return Err(HttpError::HeadTooLarge { max: MAX_HEAD_SIZE });
        }
    }
}

/// Completes a body from the bytes already buffered plus the stream.
async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    mut body: Vec<u8>,
    expected: Option<usize>,
) -> Result<Vec<u8>, HttpError> {
    match expected {
        Some(len) => {
            if len > MAX_BODY_SIZE {
                return Err(HttpError::BodyTooLarge {
                    size: len,
                    max: MAX_BODY_SIZE,
                });
            }
            if body.len() < len {
                let already = body.len();
                body.resize(len, 0);
                reader.read_exact(&mut body[already..]).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        HttpError::Incomplete
                    } else {
                        HttpError::Io(e)
                    }
                })?;
            }
            body.truncate(len);
            Ok(body)
        }
        None => {
            let limit = (MAX_BODY_SIZE + 1).saturating_sub(body.len()) as u64;
            reader.take(limit).read_to_end(&mut body).await?;
            if body.len() > MAX_BODY_SIZE {
                return Err(HttpError::BodyTooLarge {
                    size: body.len(),
                    max: MAX_BODY_SIZE,
                });
            }
            Ok(body)
        }
    }
}

fn owned_headers(headers: &[httparse::Header<'_>]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).trim().to_string(),
            )
        })
        .collect()
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn content_length(headers: &[(String, String)]) -> Result<Option<usize>, HttpError> {
    find_header(headers, "content-length")
        .map(|v| v.parse::<usize>().map_err(|_| HttpError::InvalidContentLength))
        .transpose()
}
