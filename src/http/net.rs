//! Connection handling and reply serialization.
//!
//! One worker services one TCP connection: read a full request (headers,
//! then `Content-Length` body bytes), hand it to the dispatch callback,
//! write the reply, repeat until the peer closes or a non-200 reply ends
//! the exchange.  Workers never roll back store mutations on a failed
//! send — a client that disconnects mid-transaction keeps whatever was
//! already committed.

use std::io::{Read, Write};
use std::net::TcpStream;
use tracing::{debug, warn};

use super::{
    parse_message, HttpMessage, ParseOutcome, HTTP_HDR_END_DELIM, HTTP_LINE_DELIM,
    HTTP_NOT_FOUND, HTTP_OK, HTTP_PROTOCOL_ID,
};
use crate::error::{ImgfsError, Result};

/// What the worker should do with the connection after a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAction {
    KeepAlive,
    Close,
}

/// Read one complete request from the socket.
///
/// Returns `Ok(None)` when the peer closed the connection before a full
/// request arrived.
fn read_request(stream: &mut TcpStream) -> Result<Option<HttpMessage>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        // Oversized headers and bodies are rejected by the parser itself.
        match parse_message(&buf)? {
            ParseOutcome::Complete(msg) => return Ok(Some(msg)),
            ParseOutcome::Incomplete | ParseOutcome::NeedBody { .. } => {}
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(ImgfsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-request",
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Serialize and send one reply.
///
/// Wire form: `HTTP/1.1 <status>\r\n<extra_headers>Content-Length: <n>\r\n\r\n<body>`.
/// `extra_headers` is zero or more complete `Key: value\r\n` lines.  Any
/// non-200 status asks the worker to close the connection afterwards.
pub fn http_reply(
    stream: &mut TcpStream,
    status: &str,
    extra_headers: &str,
    body: &[u8],
) -> Result<ReplyAction> {
    let head = format!(
        "{HTTP_PROTOCOL_ID}{status}{HTTP_LINE_DELIM}{extra_headers}Content-Length: {}{HTTP_HDR_END_DELIM}",
        body.len(),
    );
    stream.write_all(head.as_bytes())?;
    if !body.is_empty() {
        stream.write_all(body)?;
    }

    if status == HTTP_OK {
        Ok(ReplyAction::KeepAlive)
    } else {
        Ok(ReplyAction::Close)
    }
}

/// Serve a static file from disk as `text/html`; a missing file becomes a
/// plain 404 reply.
pub fn serve_file(stream: &mut TcpStream, filename: &str) -> Result<ReplyAction> {
    match std::fs::read(filename) {
        Ok(content) => http_reply(
            stream,
            HTTP_OK,
            &format!("Content-Type: text/html; charset=utf-8{HTTP_LINE_DELIM}"),
            &content,
        ),
        Err(e) => {
            warn!(filename, error = %e, "failed to open static file");
            http_reply(stream, HTTP_NOT_FOUND, "", b"")
        }
    }
}

/// Per-connection worker loop.
///
/// `handler` maps a parsed request to a sent reply and reports whether the
/// connection survives.  All failure paths close the socket silently; the
/// listener never joins workers.
pub fn handle_connection<H>(mut stream: TcpStream, handler: H)
where
    H: Fn(&HttpMessage, &mut TcpStream) -> Result<ReplyAction>,
{
    loop {
        let msg = match read_request(&mut stream) {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "dropping connection");
                break;
            }
        };

        match handler(&msg, &mut stream) {
            Ok(ReplyAction::KeepAlive) => continue,
            Ok(ReplyAction::Close) => break,
            Err(e) => {
                warn!(error = %e, uri = %msg.uri, "request handling failed");
                break;
            }
        }
    }
}
