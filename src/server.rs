//! HTTP dispatch — bridge between the wire layer and the storage engine.
//!
//! Routes:
//! - `GET /` or `/index.html`       → static HTML index from disk
//! - `GET /imgfs/list`              → JSON image listing
//! - `GET /imgfs/read?res=&img_id=` → JPEG bytes (lazy resize on first touch)
//! - `GET /imgfs/delete?img_id=`    → 302 back to the index
//! - `POST /imgfs/insert?name=`     → 302 back to the index
//! - anything else                  → 500 with a short error body
//!
//! Every store call holds the single store mutex from first access to
//! last; decoding, parsing and reply serialization happen outside it.
//! Operation failures become `500 Internal Server Error` replies with body
//! `Error: <message>\n`.

use std::net::TcpStream;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{ImgfsError, Result};
use crate::http::net::{http_reply, serve_file, ReplyAction};
use crate::http::{get_var, HttpMessage, HTTP_FOUND, HTTP_INTERNAL_ERROR, HTTP_LINE_DELIM, HTTP_OK};
use crate::metadata::{Resolution, MAX_IMG_ID};
use crate::store::{ImgFs, ListMode};

pub const DEFAULT_LISTENING_PORT: u16 = 8000;
/// Static HTML index served for `/`, also the redirect target after
/// mutations.
pub const BASE_FILE: &str = "index.html";

/// Longest accepted `res=` value ("thumbnail").
const MAX_RES_NAME: usize = 9;

/// Process-wide server state: the shared store behind its concurrency gate,
/// plus the listening port (used to build redirect locations).
pub struct ServerState {
    store: Mutex<ImgFs>,
    port:  u16,
}

impl ServerState {
    pub fn new(store: ImgFs, port: u16) -> Self {
        Self { store: Mutex::new(store), port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ImgFs>> {
        self.store.lock().map_err(|_| ImgfsError::Threading)
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// Map one parsed request onto a store operation and send the reply.
pub fn handle_http_message(
    state: &ServerState,
    msg: &HttpMessage,
    conn: &mut TcpStream,
) -> Result<ReplyAction> {
    debug!(method = %msg.method, uri = %msg.uri, "handling request");

    if msg.uri == "/" || msg.match_uri("/index.html") {
        return serve_file(conn, BASE_FILE);
    }

    if msg.match_uri("/imgfs/list") {
        handle_list_call(state, conn)
    } else if msg.match_uri("/imgfs/read") {
        handle_read_call(state, msg, conn)
    } else if msg.match_uri("/imgfs/delete") {
        handle_delete_call(state, msg, conn)
    } else if msg.match_uri("/imgfs/insert") && msg.match_verb("POST") {
        handle_insert_call(state, msg, conn)
    } else {
        reply_error_msg(conn, &ImgfsError::InvalidCommand)
    }
}

// ── Canned replies ───────────────────────────────────────────────────────────

fn reply_error_msg(conn: &mut TcpStream, error: &ImgfsError) -> Result<ReplyAction> {
    let body = format!("Error: {error}\n");
    http_reply(conn, HTTP_INTERNAL_ERROR, "", body.as_bytes())
}

fn reply_302_msg(state: &ServerState, conn: &mut TcpStream) -> Result<ReplyAction> {
    let location = format!(
        "Location: http://localhost:{}/{BASE_FILE}{HTTP_LINE_DELIM}",
        state.port(),
    );
    http_reply(conn, HTTP_FOUND, &location, b"")
}

// ── Route handlers ───────────────────────────────────────────────────────────

fn handle_list_call(state: &ServerState, conn: &mut TcpStream) -> Result<ReplyAction> {
    let json = {
        let store = state.lock()?;
        store.list(ListMode::Json)
    };
    match json {
        Ok(Some(json)) => http_reply(
            conn,
            HTTP_OK,
            &format!("Content-Type: application/json{HTTP_LINE_DELIM}"),
            json.as_bytes(),
        ),
        Ok(None) => reply_error_msg(conn, &ImgfsError::Runtime),
        Err(e) => reply_error_msg(conn, &e),
    }
}

fn handle_read_call(
    state: &ServerState,
    msg: &HttpMessage,
    conn: &mut TcpStream,
) -> Result<ReplyAction> {
    let res_name = match get_var(&msg.uri, "res", MAX_RES_NAME) {
        Ok(Some(v)) => v,
        Ok(None) => return reply_error_msg(conn, &ImgfsError::NotEnoughArguments),
        Err(ImgfsError::Runtime) => return reply_error_msg(conn, &ImgfsError::Resolutions),
        Err(e) => return reply_error_msg(conn, &e),
    };
    let img_id = match get_var(&msg.uri, "img_id", MAX_IMG_ID) {
        Ok(Some(v)) => v,
        Ok(None) => return reply_error_msg(conn, &ImgfsError::NotEnoughArguments),
        Err(ImgfsError::Runtime) => return reply_error_msg(conn, &ImgfsError::InvalidImgId),
        Err(e) => return reply_error_msg(conn, &e),
    };
    let resolution = match Resolution::from_name(&res_name) {
        Some(r) => r,
        None => return reply_error_msg(conn, &ImgfsError::Resolutions),
    };

    let image = {
        let mut store = state.lock()?;
        store.read(&img_id, resolution)
    };
    match image {
        Ok(bytes) => http_reply(
            conn,
            HTTP_OK,
            &format!("Content-Type: image/jpeg{HTTP_LINE_DELIM}"),
            &bytes,
        ),
        Err(e) => reply_error_msg(conn, &e),
    }
}

fn handle_delete_call(
    state: &ServerState,
    msg: &HttpMessage,
    conn: &mut TcpStream,
) -> Result<ReplyAction> {
    let img_id = match get_var(&msg.uri, "img_id", MAX_IMG_ID) {
        Ok(Some(v)) => v,
        Ok(None) => return reply_error_msg(conn, &ImgfsError::NotEnoughArguments),
        Err(ImgfsError::Runtime) => return reply_error_msg(conn, &ImgfsError::InvalidImgId),
        Err(e) => return reply_error_msg(conn, &e),
    };

    let deleted = {
        let mut store = state.lock()?;
        store.delete(&img_id)
    };
    match deleted {
        Ok(()) => reply_302_msg(state, conn),
        Err(e) => reply_error_msg(conn, &e),
    }
}

fn handle_insert_call(
    state: &ServerState,
    msg: &HttpMessage,
    conn: &mut TcpStream,
) -> Result<ReplyAction> {
    let name = match get_var(&msg.uri, "name", MAX_IMG_ID) {
        Ok(Some(v)) => v,
        Ok(None) => return reply_error_msg(conn, &ImgfsError::NotEnoughArguments),
        Err(ImgfsError::Runtime) => return reply_error_msg(conn, &ImgfsError::InvalidFilename),
        Err(e) => return reply_error_msg(conn, &e),
    };
    if msg.body.is_empty() {
        return reply_error_msg(conn, &ImgfsError::NotEnoughArguments);
    }

    let inserted = {
        let mut store = state.lock()?;
        store.insert(&msg.body, &name)
    };
    match inserted {
        Ok(()) => reply_302_msg(state, conn),
        Err(e) => reply_error_msg(conn, &e),
    }
}
