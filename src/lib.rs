//! # imgfs — single-file content-addressed JPEG image store
//!
//! Store guarantees:
//! - Fixed layout: 64-byte header, `max_files` × 208-byte slots, then an
//!   append-only blob region; all integer fields little-endian
//! - Up to three resolutions per image (thumb, small, orig); derived
//!   resolutions are materialized lazily on first read
//! - Deduplication by identifier (rejected) and by SHA-256 content digest
//!   (blob locations aliased, no bytes appended)
//! - `version` strictly increases across committed inserts and deletes;
//!   reads and lazy resizes never bump it
//! - Blobs are never rewritten in place; deletion flips a slot to `EMPTY`
//!   and may orphan bytes (no compaction)
//!
//! The HTTP front-end serializes every store operation behind one mutex;
//! see `server` and `http::net` for the worker-per-connection model.

pub mod codec;
pub mod dedup;
pub mod error;
pub mod header;
pub mod http;
pub mod metadata;
pub mod resize;
pub mod server;
pub mod store;

// Flat re-exports for the most common types.
pub use dedup::DedupOutcome;
pub use error::{ImgfsError, Result};
pub use header::{Header, HEADER_SIZE, IMGFS_NAME};
pub use metadata::{Resolution, Slot, EMPTY, MAX_IMG_ID, NON_EMPTY, SLOT_SIZE};
pub use store::{CreateOptions, ImgFs, ListMode};
