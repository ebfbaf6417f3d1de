//! HTTP/1.1 Framing
//!
//! Request parsing and response serialization for the server side of
//! HTTP/1.1. One request per connection; bodies are sized by
//! `Content-Length` only.

use crate::ServerError;
use smol::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest request body accepted
pub const MAX_BODY: usize = 64 * 1024;

/// Most header lines accepted
const MAX_HEADERS: usize = 100;

/// Longest request line or header line accepted, terminator included
pub const MAX_LINE: usize = 8 * 1024;

/// HTTP/1.1 request
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, uppercased
    pub method: String,
    /// Percent-encoded path without the query
    pub path: String,
    /// Decoded query pairs in order
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a method and request target (`/path?query`)
    pub fn new(method: &str, target: &str) -> Result<Self, ServerError> {
        let (path, query) = split_target(target)?;
        Ok(Self {
            method: method.to_uppercase(),
            path,
            query,
            headers: Vec::new(),
            body: Vec::new(),
        })
    }

    /// Add a header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Get header value (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get Content-Length
    pub fn content_length(&self) -> Option<usize> {
        self.header_value("content-length")
            .and_then(|v| v.trim().parse().ok())
    }
}

fn split_target(target: &str) -> Result<(String, Vec<(String, String)>), ServerError> {
    if !target.starts_with('/') {
        return Err(ServerError::BadRequest(format!("unsupported request target {target:?}")));
    }
    let base = url::Url::parse("http://localhost/")
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let url = base
        .join(target)
        .map_err(|e| ServerError::BadRequest(format!("{target:?}: {e}")))?;
    let query = url.query_pairs().into_owned().collect();
    Ok((url.path().to_string(), query))
}

/// Read one request from a buffered stream
pub async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Request, ServerError> {
    let mut line = String::new();
    read_line_capped(reader, &mut line).await?;
    if line.trim().is_empty() {
        return Err(ServerError::BadRequest("empty request".to_string()));
    }

    // Request line
    let mut parts = line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v)) => (m, t, v),
        _ => return Err(ServerError::BadRequest(format!("bad request line {:?}", line.trim_end()))),
    };
    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(ServerError::BadRequest(format!("unsupported version {version}")));
    }
    let mut request = Request::new(method, target)?;

    // Headers
    loop {
        line.clear();
        let read = read_line_capped(reader, &mut line).await?;
        if read == 0 || line == "\r\n" || line == "\n" {
            break;
        }
        if request.headers.len() >= MAX_HEADERS {
            return Err(ServerError::BadRequest("too many headers".to_string()));
        }
        if let Some((name, value)) = line.trim_end().split_once(':') {
            request.headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    // Body
    if let Some(len) = request.content_length() {
        if len > MAX_BODY {
            return Err(ServerError::BadRequest(format!("body of {len} bytes is too large")));
        }
        request.body.resize(len, 0);
        reader.read_exact(&mut request.body).await?;
    }

    Ok(request)
}

/// `read_line` that refuses lines longer than `MAX_LINE`
async fn read_line_capped<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut String,
) -> Result<usize, ServerError> {
    let read = (&mut *reader)
        .take(MAX_LINE as u64 + 1)
        .read_line(line)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => ServerError::BadRequest("header is not UTF-8".to_string()),
            _ => ServerError::Io(e),
        })?;
    if line.len() > MAX_LINE {
        return Err(ServerError::BadRequest(format!("line exceeds {MAX_LINE} bytes")));
    }
    Ok(read)
}

/// HTTP/1.1 response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    /// JSON body
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, "application/json", value.to_string().into_bytes())
    }

    /// `{"error": message}`
    pub fn error(status: u16, message: impl std::fmt::Display) -> Self {
        Self::json(status, &serde_json::json!({ "error": message.to_string() }))
    }

    /// Get header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as JSON
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.body.len() + 128);

        // Status line
        buf.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status)).as_bytes());

        for (name, value) in &self.headers {
            buf.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        buf.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        buf.extend_from_slice(b"Connection: close\r\n\r\n");

        buf.extend_from_slice(&self.body);
        buf
    }

    /// Write to a stream
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.serialize()).await?;
        writer.flush().await
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        _ => "",
    }
}
