//! End-to-end HTTP tests: a real listener, real sockets, and the full
//! dispatch path over a scratch store.

mod common;

use common::sample_jpeg;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use tempfile::NamedTempFile;

use imgfs::http::net::handle_connection;
use imgfs::server::{handle_http_message, ServerState};
use imgfs::store::{CreateOptions, ImgFs};

// ── Harness ──────────────────────────────────────────────────────────────────

/// Bind an ephemeral port, wrap a fresh store, and serve connections in
/// background threads for the lifetime of the test process.
fn start_server(max_files: u32) -> (u16, Arc<ServerState>) {
    let tmp = NamedTempFile::new().unwrap();
    let opts = CreateOptions {
        max_files,
        thumb_res: (64, 64),
        small_res: (256, 256),
    };
    let store = ImgFs::create(tmp.path(), &opts).unwrap();
    // Keep the backing file alive for the whole process.
    std::mem::forget(tmp);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(ServerState::new(store, port));

    let accept_state = Arc::clone(&state);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let state = Arc::clone(&accept_state);
            std::thread::spawn(move || {
                handle_connection(stream, |msg, conn| handle_http_message(&state, msg, conn));
            });
        }
    });

    (port, state)
}

struct Reply {
    status:  String,
    headers: Vec<(String, String)>,
    body:    Vec<u8>,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Send one raw request and read one full reply.
fn request(port: u16, raw: &[u8]) -> Reply {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.write_all(raw).unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed before reply headers completed");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8(buf[..header_end].to_vec()).unwrap();
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap();
    let status = status_line
        .strip_prefix("HTTP/1.1 ")
        .expect("malformed status line")
        .to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(": "))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

    let content_len: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| v.parse().unwrap())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_len {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed before reply body completed");
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_len);

    Reply { status, headers, body }
}

fn get(port: u16, path: &str) -> Reply {
    request(port, format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
}

fn post(port: u16, path: &str, body: &[u8]) -> Reply {
    let mut raw = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n",
        body.len(),
    )
    .into_bytes();
    raw.extend_from_slice(body);
    request(port, &raw)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn full_image_lifecycle_over_http() {
    let (port, _state) = start_server(8);
    let img = sample_jpeg(320, 240, 11);

    // Empty listing first.
    let reply = get(port, "/imgfs/list");
    assert_eq!(reply.status, "200 OK");
    assert_eq!(reply.header("Content-Type"), Some("application/json"));
    assert_eq!(reply.body, br#"{"Images":[]}"#);

    // Insert redirects back to the index.
    let reply = post(port, "/imgfs/insert?name=cat", &img);
    assert_eq!(reply.status, "302 Found");
    assert!(reply.header("Location").unwrap().ends_with("/index.html"));

    let reply = get(port, "/imgfs/list");
    assert_eq!(reply.body, br#"{"Images":["cat"]}"#);

    // Original bytes round-trip.
    let reply = get(port, "/imgfs/read?res=orig&img_id=cat");
    assert_eq!(reply.status, "200 OK");
    assert_eq!(reply.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(reply.body, img);

    // Lazy thumbnail on first read.
    let reply = get(port, "/imgfs/read?res=thumb&img_id=cat");
    assert_eq!(reply.status, "200 OK");
    let (w, h) = imgfs::codec::get_resolution(&reply.body).unwrap();
    assert!(w <= 64 && h <= 64);

    // Delete, then the listing is empty again.
    let reply = get(port, "/imgfs/delete?img_id=cat");
    assert_eq!(reply.status, "302 Found");

    let reply = get(port, "/imgfs/list");
    assert_eq!(reply.body, br#"{"Images":[]}"#);
}

#[test]
fn unknown_route_is_500_with_error_body() {
    let (port, _state) = start_server(4);
    let reply = get(port, "/imgfs/rename?img_id=a");
    assert_eq!(reply.status, "500 Internal Server Error");
    assert!(reply.body.starts_with(b"Error: "));
}

#[test]
fn read_of_missing_image_is_500_not_found() {
    let (port, _state) = start_server(4);
    let reply = get(port, "/imgfs/read?res=orig&img_id=ghost");
    assert_eq!(reply.status, "500 Internal Server Error");
    assert_eq!(reply.body, b"Error: Image not found\n");
}

#[test]
fn missing_query_variable_is_500() {
    let (port, _state) = start_server(4);
    let reply = get(port, "/imgfs/read?res=orig");
    assert_eq!(reply.status, "500 Internal Server Error");
    assert_eq!(reply.body, b"Error: Not enough arguments\n");
}

#[test]
fn duplicate_insert_is_500_duplicate_id() {
    let (port, _state) = start_server(4);
    let img = sample_jpeg(100, 100, 3);

    assert_eq!(post(port, "/imgfs/insert?name=twin", &img).status, "302 Found");
    let reply = post(port, "/imgfs/insert?name=twin", &img);
    assert_eq!(reply.status, "500 Internal Server Error");
    assert_eq!(reply.body, b"Error: Duplicate image ID\n");
}

#[test]
fn index_page_served_from_disk() {
    let (port, _state) = start_server(4);
    let reply = get(port, "/");
    assert_eq!(reply.status, "200 OK");
    assert_eq!(
        reply.header("Content-Type"),
        Some("text/html; charset=utf-8")
    );
    assert!(!reply.body.is_empty());
}

#[test]
fn concurrent_inserts_are_serialized_by_the_gate() {
    let (port, _state) = start_server(16);

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            std::thread::spawn(move || {
                let img = sample_jpeg(80, 80, 50 + i);
                let reply = post(port, &format!("/imgfs/insert?name=img{i}"), &img);
                assert_eq!(reply.status, "302 Found");
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let reply = get(port, "/imgfs/list");
    let listing: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    let mut ids: Vec<String> = listing["Images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_owned())
        .collect();
    ids.sort();
    assert_eq!(ids, ["img0", "img1", "img2", "img3"]);
}
