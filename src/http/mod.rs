//! HTTP/1.1 wire parsing.
//!
//! Minimal request-side protocol support for the image server: request line,
//! header fields, `Content-Length`-delimited bodies, and query-string
//! variable extraction.  Replies and the per-connection loop live in
//! [`net`].
//!
//! Framing rules:
//! - header lines end with CRLF; the header section ends with CRLF CRLF;
//! - body length comes from `Content-Length` exclusively (no chunked
//!   encoding);
//! - a declared body larger than [`MAX_REQUEST_SIZE`] is rejected before
//!   any body byte is read.

pub mod net;

use crate::error::{ImgfsError, Result};

pub const HTTP_LINE_DELIM: &str = "\r\n";
pub const HTTP_HDR_END_DELIM: &str = "\r\n\r\n";
pub const HTTP_HDR_KV_DELIM: &str = ": ";
pub const HTTP_PROTOCOL_ID: &str = "HTTP/1.1 ";

pub const HTTP_OK: &str = "200 OK";
pub const HTTP_FOUND: &str = "302 Found";
pub const HTTP_NOT_FOUND: &str = "404 Not Found";
pub const HTTP_INTERNAL_ERROR: &str = "500 Internal Server Error";

/// Upper bound on the header section of one request.
pub const MAX_HEADER_SIZE: usize = 16384;
/// Upper bound on a request body (2^23 bytes).
pub const MAX_REQUEST_SIZE: usize = 1 << 23;
/// Upper bound on parsed header fields per request.
pub const MAX_HEADERS: usize = 32;

// ── Message ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeaderField {
    pub key:   String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct HttpMessage {
    pub method:  String,
    pub uri:     String,
    pub headers: Vec<HeaderField>,
    pub body:    Vec<u8>,
}

impl HttpMessage {
    /// Whether the request URI starts with `target_uri`.
    pub fn match_uri(&self, target_uri: &str) -> bool {
        self.uri.starts_with(target_uri)
    }

    /// Whether the request method equals `verb` exactly.
    pub fn match_verb(&self, verb: &str) -> bool {
        self.method == verb
    }
}

/// Result of parsing a (possibly still incomplete) request buffer.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Header section not yet fully received.
    Incomplete,
    /// Headers parsed; `content_len` body bytes are expected in total.
    NeedBody { content_len: usize },
    Complete(HttpMessage),
}

/// Parse one request from `stream`.
///
/// Returns [`ParseOutcome::Incomplete`] until the CRLF CRLF terminator has
/// been received, then [`ParseOutcome::NeedBody`] until the declared body
/// has fully arrived.
pub fn parse_message(stream: &[u8]) -> Result<ParseOutcome> {
    let hdr_end = match find(stream, HTTP_HDR_END_DELIM.as_bytes()) {
        Some(pos) => pos,
        None => {
            if stream.len() > MAX_HEADER_SIZE {
                return Err(ImgfsError::InvalidArgument);
            }
            return Ok(ParseOutcome::Incomplete);
        }
    };

    let head = std::str::from_utf8(&stream[..hdr_end])
        .map_err(|_| ImgfsError::InvalidArgument)?;
    let mut lines = head.split(HTTP_LINE_DELIM);

    let request_line = lines.next().ok_or(ImgfsError::InvalidArgument)?;
    let mut parts = request_line.splitn(3, ' ');
    let method = parts.next().unwrap_or("").to_owned();
    let uri = parts.next().unwrap_or("").to_owned();
    if method.is_empty() || uri.is_empty() {
        return Err(ImgfsError::InvalidArgument);
    }

    let mut headers = Vec::new();
    let mut content_len = 0usize;
    for line in lines.take(MAX_HEADERS) {
        let (key, value) = match line.split_once(HTTP_HDR_KV_DELIM) {
            Some(kv) => kv,
            None => continue,
        };
        if key.eq_ignore_ascii_case("Content-Length") {
            content_len = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ImgfsError::InvalidArgument)?;
        }
        headers.push(HeaderField { key: key.to_owned(), value: value.to_owned() });
    }

    if content_len > MAX_REQUEST_SIZE {
        return Err(ImgfsError::InvalidArgument);
    }

    let body_start = hdr_end + HTTP_HDR_END_DELIM.len();
    let available = stream.len() - body_start;
    if available < content_len {
        return Ok(ParseOutcome::NeedBody { content_len });
    }

    let body = stream[body_start..body_start + content_len].to_vec();
    Ok(ParseOutcome::Complete(HttpMessage { method, uri, headers, body }))
}

// ── Query variables ──────────────────────────────────────────────────────────

/// Extract the value of query variable `name` from `uri`.
///
/// The value runs from `name=` (anchored after `?` or `&`) up to the next
/// `&` or end-of-URI.  Returns `Ok(None)` when the variable is absent,
/// [`ImgfsError::Runtime`] when the value is empty or longer than
/// `max_len` — callers map that to a variable-specific error kind.
pub fn get_var(uri: &str, name: &str, max_len: usize) -> Result<Option<String>> {
    let query = match uri.split_once('?') {
        Some((_, q)) => q,
        None => return Err(ImgfsError::InvalidArgument),
    };

    let prefix = format!("{name}=");
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix(prefix.as_str()) {
            if value.is_empty() || value.len() > max_len {
                return Err(ImgfsError::Runtime);
            }
            return Ok(Some(value.to_owned()));
        }
    }
    Ok(None)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
