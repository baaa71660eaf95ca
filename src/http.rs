//! Simple HTTP client for no_std environments
//!
//! Provides basic GET requests with streaming response body support over
//! any `embedded-io-async` transport (a TCP socket on the device, an
//! in-memory stream in tests). Plain HTTP only.

use core::fmt::{self, Write as FmtWrite};
use core::str;
use embedded_io_async::{Read, Write};
use heapless::String;

/// HTTP client error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Failed to connect to server
    Connect,
    /// Failed to write request
    Write,
    /// Failed to read response
    Read,
    /// Invalid URL format
    InvalidUrl,
    /// Host name did not resolve
    Dns,
    /// Response parsing error
    Parse,
    /// HTTP error status code
    Status(u16),
    /// Response too large
    TooLarge,
    /// No answer within the timeout
    Timeout,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Connect => write!(f, "connect failed"),
            HttpError::Write => write!(f, "write failed"),
            HttpError::Read => write!(f, "read failed"),
            HttpError::InvalidUrl => write!(f, "invalid url"),
            HttpError::Dns => write!(f, "dns lookup failed"),
            HttpError::Parse => write!(f, "malformed response"),
            HttpError::Status(code) => write!(f, "http status {}", code),
            HttpError::TooLarge => write!(f, "response too large"),
            HttpError::Timeout => write!(f, "timed out"),
        }
    }
}

/// Parsed URL components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl<'a> Url<'a> {
    /// Parse a URL string into components
    /// Supports: http://host[:port][/path]
    pub fn parse(url: &'a str) -> Result<Self, HttpError> {
        let rest = url.strip_prefix("http://").ok_or(HttpError::InvalidUrl)?;

        // Find path separator
        let (host_port, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        // Parse host and optional port
        let (host, port) = match host_port.find(':') {
            Some(idx) => {
                let port_str = &host_port[idx + 1..];
                let port = port_str.parse().map_err(|_| HttpError::InvalidUrl)?;
                (&host_port[..idx], port)
            }
            None => (host_port, 80),
        };

        if host.is_empty() {
            return Err(HttpError::InvalidUrl);
        }

        Ok(Url { host, port, path })
    }
}

/// HTTP response with streaming body
pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<usize>,
    pub content_type: heapless::String<64>,
    pub body_read: usize,
}

impl HttpResponse {
    /// Create a new response from parsed headers
    pub fn new(status: u16, content_length: Option<usize>, content_type: &str) -> Self {
        let mut ct = heapless::String::new();
        let _ = ct.push_str(content_type);
        Self {
            status,
            content_length,
            content_type: ct,
            body_read: 0,
        }
    }

    /// Get remaining body bytes to read
    pub fn remaining(&self) -> Option<usize> {
        self.content_length.map(|len| len.saturating_sub(self.body_read))
    }
}

/// Collects a response body into a fixed buffer, remembering overflow
pub struct BodyBuffer<'a> {
    buf: &'a mut [u8],
    len: usize,
    overflowed: bool,
}

impl<'a> BodyBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            len: 0,
            overflowed: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let remaining = self.buf.len() - self.len;
        let to_copy = chunk.len().min(remaining);
        self.buf[self.len..self.len + to_copy].copy_from_slice(&chunk[..to_copy]);
        self.len += to_copy;
        if to_copy < chunk.len() {
            self.overflowed = true;
        }
    }

    /// Body length, or `TooLarge` if anything was dropped
    pub fn finish(self) -> Result<usize, HttpError> {
        if self.overflowed {
            Err(HttpError::TooLarge)
        } else {
            Ok(self.len)
        }
    }
}

/// Perform an HTTP GET request and stream the response
///
/// The `on_body_chunk` callback is called with each chunk of body data.
/// Returns the HTTP response headers.
pub async fn get<T, F>(
    transport: &mut T,
    url: &Url<'_>,
    rx_buf: &mut [u8],
    mut on_body_chunk: F,
) -> Result<HttpResponse, HttpError>
where
    T: Read + Write,
    F: FnMut(&[u8]),
{
    // Build request; HTTP/1.0 keeps servers from answering chunked
    let mut request: String<384> = String::new();
    write!(
        &mut request,
        "GET {} HTTP/1.0\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        url.path, url.host
    )
    .map_err(|_| HttpError::TooLarge)?;

    // Send request
    transport
        .write_all(request.as_bytes())
        .await
        .map_err(|_| HttpError::Write)?;
    transport.flush().await.map_err(|_| HttpError::Write)?;

    // Read response headers
    let mut total_read = 0;

    // Read until we find \r\n\r\n
    let headers_end = loop {
        if total_read >= rx_buf.len() {
            return Err(HttpError::TooLarge);
        }

        let n = transport
            .read(&mut rx_buf[total_read..])
            .await
            .map_err(|_| HttpError::Read)?;

        if n == 0 {
            return Err(HttpError::Read);
        }

        total_read += n;

        // Look for end of headers
        if let Some(pos) = find_header_end(&rx_buf[..total_read]) {
            break pos;
        }
    };
    let header_bytes = &rx_buf[..headers_end];
    let header_str = str::from_utf8(header_bytes).map_err(|_| HttpError::Parse)?;

    // Parse status line
    let status = parse_status(header_str)?;

    // Parse headers
    let content_length = parse_header(header_str, "content-length").and_then(|v| v.parse().ok());
    let content_type = parse_header(header_str, "content-type").unwrap_or("");

    let body_start = headers_end + 4; // Skip \r\n\r\n
    let mut response = HttpResponse::new(status, content_length, content_type);

    // Anything but 2xx is a failed exchange
    if !(200..300).contains(&status) {
        return Err(HttpError::Status(status));
    }

    // Process any body data already read
    if total_read > body_start {
        let mut initial_body = &rx_buf[body_start..total_read];
        if let Some(len) = response.content_length {
            initial_body = &initial_body[..initial_body.len().min(len)];
        }
        on_body_chunk(initial_body);
        response.body_read += initial_body.len();
    }

    // Continue reading body
    loop {
        // Check if we've read everything
        if let Some(remaining) = response.remaining() {
            if remaining == 0 {
                break;
            }
        }

        let n = transport.read(rx_buf).await.map_err(|_| HttpError::Read)?;
        if n == 0 {
            break;
        }

        on_body_chunk(&rx_buf[..n]);
        response.body_read += n;
    }

    Ok(response)
}

/// Find the position of \r\n\r\n in the buffer
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse HTTP status code from status line
pub fn parse_status(headers: &str) -> Result<u16, HttpError> {
    // HTTP/1.1 200 OK
    let line = headers.lines().next().ok_or(HttpError::Parse)?;
    let parts: heapless::Vec<&str, 3> = line.splitn(3, ' ').collect();
    if parts.len() < 2 || !parts[0].starts_with("HTTP/") {
        return Err(HttpError::Parse);
    }
    parts[1].parse().map_err(|_| HttpError::Parse)
}

/// Parse a header value (case-insensitive)
pub fn parse_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Parse a dotted-quad host so numeric hosts skip DNS
pub fn parse_ipv4(host: &str) -> Result<core::net::Ipv4Addr, HttpError> {
    host.parse().map_err(|_| HttpError::InvalidUrl)
}
