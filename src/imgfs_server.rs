//! imgfs_server — HTTP front-end over one shared store.
//!
//! `imgfs_server <store> [<port>]` (default port 8000).  The listener
//! accepts forever and spawns one detached worker thread per connection.
//! SIGINT/SIGTERM are blocked in workers; only the main thread reacts to
//! them, by leaving the accept loop and tearing the store down.

use clap::Parser;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use imgfs::error::ImgfsError;
use imgfs::http::net::handle_connection;
use imgfs::server::{handle_http_message, ServerState, DEFAULT_LISTENING_PORT};
use imgfs::store::ImgFs;

#[derive(Parser)]
#[command(name = "imgfs_server", version, about = "ImgFS HTTP server")]
struct Cli {
    /// Path to an existing imgFS store file
    store: PathBuf,
    /// Listening port
    port: Option<u16>,
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_shutdown_signal(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers without SA_RESTART, so a pending
/// `accept` returns EINTR and the loop can observe the flag.
fn install_signal_handlers() -> Result<(), ImgfsError> {
    let handler: extern "C" fn(libc::c_int) = on_shutdown_signal;
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        for sig in [libc::SIGINT, libc::SIGTERM] {
            if libc::sigaction(sig, &action, std::ptr::null_mut()) != 0 {
                return Err(ImgfsError::Threading);
            }
        }
    }
    Ok(())
}

/// Block SIGINT/SIGTERM on the calling worker thread.
fn block_shutdown_signals() {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        libc::sigaddset(&mut set, libc::SIGTERM);
        libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
    }
}

fn run(cli: Cli) -> Result<(), ImgfsError> {
    let port = cli.port.unwrap_or(DEFAULT_LISTENING_PORT);

    let store = ImgFs::open(&cli.store, "r+b").map_err(|_| ImgfsError::InvalidFilename)?;
    store.header.print();

    install_signal_handlers()?;

    let listener = TcpListener::bind(("0.0.0.0", port))?;
    let state = Arc::new(ServerState::new(store, port));
    println!("ImgFS server started on http://localhost:{port}");

    while !SHUTDOWN.load(Ordering::SeqCst) {
        let (stream, peer) = match listener.accept() {
            Ok(conn) => conn,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        debug!(%peer, "accepted connection");

        let state = Arc::clone(&state);
        std::thread::spawn(move || {
            block_shutdown_signals();
            handle_connection(stream, |msg, conn| handle_http_message(&state, msg, conn));
        });
    }

    eprintln!("Shutting down...");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
