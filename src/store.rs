//! Storage engine — the [`ImgFs`] handle and its operation surface.
//!
//! # Container
//! A store is one file: the 64-byte header, then `max_files` fixed-size
//! metadata slots, then the append-only blob region.  Blobs are never
//! rewritten in place; deletion only flips a slot back to `EMPTY`, so
//! unreferenced bytes may accumulate (no compaction).
//!
//! # Invariants (hold whenever an operation returns `Ok`)
//! - `nb_files` equals the number of `NON_EMPTY` slots
//! - identifiers of `NON_EMPTY` slots are pairwise distinct
//! - every `NON_EMPTY` slot has a located original blob
//! - per resolution, `size == 0 ⇔ offset == 0`
//! - the on-disk header and slot bytes match the in-memory copies after
//!   every committed mutation
//!
//! # Mutation protocol
//! `insert` and `delete` bump `version` and persist header + touched slot;
//! the first read of a derived resolution may append a blob and persist the
//! touched slot without bumping `version` (see `resize`).

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec;
use crate::dedup::{self, DedupOutcome};
use crate::error::{ImgfsError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::metadata::{Resolution, Slot, EMPTY, MAX_IMG_ID, NON_EMPTY, SLOT_SIZE};
use crate::resize;

// ── Creation options ─────────────────────────────────────────────────────────

pub const DEFAULT_MAX_FILES: u32 = 128;
pub const DEFAULT_THUMB_RES: u16 = 64;
pub const DEFAULT_SMALL_RES: u16 = 256;
pub const MAX_THUMB_RES: u16 = 128;
pub const MAX_SMALL_RES: u16 = 512;

/// Configuration for [`ImgFs::create`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub max_files: u32,
    pub thumb_res: (u16, u16),
    pub small_res: (u16, u16),
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            thumb_res: (DEFAULT_THUMB_RES, DEFAULT_THUMB_RES),
            small_res: (DEFAULT_SMALL_RES, DEFAULT_SMALL_RES),
        }
    }
}

impl CreateOptions {
    /// Reject zero or out-of-range parameters before anything is written.
    fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(ImgfsError::InvalidArgument);
        }
        if self.max_files == u32::MAX {
            return Err(ImgfsError::MaxFiles);
        }
        let (tw, th) = self.thumb_res;
        if tw == 0 || th == 0 || tw > MAX_THUMB_RES || th > MAX_THUMB_RES {
            return Err(ImgfsError::Resolutions);
        }
        let (sw, sh) = self.small_res;
        if sw == 0 || sh == 0 || sw > MAX_SMALL_RES || sh > MAX_SMALL_RES {
            return Err(ImgfsError::Resolutions);
        }
        Ok(())
    }
}

// ── List output ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Stdout,
    Json,
}

#[derive(Serialize)]
struct ImageList {
    #[serde(rename = "Images")]
    images: Vec<String>,
}

// ── Open modes ───────────────────────────────────────────────────────────────

/// The accepted fopen-style mode strings.  Anything else is an I/O error.
const VALID_OPEN_MODES: [&str; 15] = [
    "r", "w", "a", "r+", "w+", "a+", "rb", "wb", "ab", "rb+", "r+b", "wb+",
    "w+b", "ab+", "a+b",
];

fn open_options_for(mode: &str) -> Result<OpenOptions> {
    if !VALID_OPEN_MODES.contains(&mode) {
        return Err(ImgfsError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid open mode \"{mode}\""),
        )));
    }
    let plus = mode.contains('+');
    let mut opts = OpenOptions::new();
    if mode.starts_with('r') {
        opts.read(true).write(plus);
    } else if mode.starts_with('w') {
        opts.read(plus).write(true).create(true).truncate(true);
    } else {
        // 'a' family
        opts.read(plus).append(true).create(true);
    }
    Ok(opts)
}

// ── ImgFs ────────────────────────────────────────────────────────────────────

/// An open store: file handle, header copy, and the in-memory slot table
/// mirroring the on-disk one.  Dropping the handle releases both.
pub struct ImgFs {
    file: File,
    pub header: Header,
    pub slots: Vec<Slot>,
}

impl ImgFs {
    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Initialize a fresh store file: header plus `max_files` zeroed `EMPTY`
    /// slots.  Prints the number of items written.
    pub fn create<P: AsRef<Path>>(path: P, opts: &CreateOptions) -> Result<Self> {
        opts.validate()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let header = Header::new(opts.max_files, opts.thumb_res, opts.small_res);
        let slots = vec![Slot::default(); opts.max_files as usize];

        header.write(&mut file)?;
        for slot in &slots {
            slot.write(&mut file)?;
        }

        println!("{} item(s) written", opts.max_files + 1);
        Ok(Self { file, header, slots })
    }

    /// Open an existing store: read the header, then the full slot table.
    /// `mode` must be one of the well-known binary-capable fopen modes.
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self> {
        let mut file = open_options_for(mode)?.open(path)?;

        let header = Header::read(&mut file)?;
        let mut slots = Vec::with_capacity(header.max_files as usize);
        for _ in 0..header.max_files {
            slots.push(Slot::read(&mut file)?);
        }
        Ok(Self { file, header, slots })
    }

    // ── Container I/O ────────────────────────────────────────────────────────

    /// Seek to offset 0 and rewrite the full header.
    pub fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.file)?;
        Ok(())
    }

    /// Rewrite exactly one slot at its fixed table position.
    pub fn write_slot(&mut self, index: usize) -> Result<()> {
        let pos = HEADER_SIZE as u64 + index as u64 * SLOT_SIZE as u64;
        self.file.seek(SeekFrom::Start(pos))?;
        self.slots[index].write(&mut self.file)?;
        Ok(())
    }

    /// Append raw bytes at end-of-file; returns the pre-write offset.
    pub fn append_blob(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(bytes)?;
        Ok(offset)
    }

    /// Read exactly `size` blob bytes starting at `offset`.
    pub fn read_blob(&mut self, offset: u64, size: u32) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    // ── Index scans (ascending, first match wins) ────────────────────────────

    /// Index of the non-empty slot carrying `img_id`.
    pub fn find_by_id(&self, img_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| !s.is_empty() && s.img_id_str() == img_id)
    }

    /// Index of a non-empty slot with this content digest, skipping
    /// `exclude`.
    pub fn find_by_sha(&self, sha: &[u8; 32], exclude: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .find(|(i, s)| *i != exclude && !s.is_empty() && &s.sha == sha)
            .map(|(i, _)| i)
    }

    /// Lowest-indexed `EMPTY` slot.
    pub fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_empty())
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Insert an image under `img_id` (truncated to `MAX_IMG_ID` bytes).
    ///
    /// Content identical to an existing image is deduplicated: the new slot
    /// aliases the existing blobs and no bytes are appended.  The slot is
    /// only marked `NON_EMPTY` once every fallible step has succeeded; on
    /// any failure the candidate slot is restored to its zeroed state.
    pub fn insert(&mut self, image_buffer: &[u8], img_id: &str) -> Result<()> {
        if image_buffer.is_empty() || img_id.is_empty() {
            return Err(ImgfsError::InvalidArgument);
        }
        if self.header.nb_files >= self.header.max_files {
            return Err(ImgfsError::Full);
        }
        let k = self.first_empty().ok_or(ImgfsError::Full)?;
        let (nb_files, version) = (self.header.nb_files, self.header.version);

        match self.fill_and_commit(k, image_buffer, img_id) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Roll the candidate back; it was never marked NON_EMPTY.
                // An appended blob, if any, stays orphaned in the file.
                self.slots[k] = Slot::default();
                self.header.nb_files = nb_files;
                self.header.version = version;
                Err(e)
            }
        }
    }

    fn fill_and_commit(&mut self, k: usize, image_buffer: &[u8], img_id: &str) -> Result<()> {
        let digest: [u8; 32] = Sha256::digest(image_buffer).into();
        self.slots[k].sha = digest;
        self.slots[k].set_img_id(img_id);
        self.slots[k].size[Resolution::Orig.index()] = image_buffer.len() as u32;

        let (width, height) = codec::get_resolution(image_buffer)?;
        self.slots[k].orig_res = [width, height];

        match dedup::name_and_content_dedup(self, k)? {
            DedupOutcome::Shared => {
                // All blob locations aliased from the twin, derived
                // resolutions included.
            }
            DedupOutcome::Unique => {
                let offset = self.append_blob(image_buffer)?;
                self.slots[k].offset[Resolution::Orig.index()] = offset;
                self.slots[k].size[Resolution::Thumb.index()] = 0;
                self.slots[k].size[Resolution::Small.index()] = 0;
                self.slots[k].offset[Resolution::Thumb.index()] = 0;
                self.slots[k].offset[Resolution::Small.index()] = 0;
            }
        }

        self.slots[k].is_valid = NON_EMPTY;
        self.header.nb_files += 1;
        self.header.version += 1;

        self.write_header()?;
        self.write_slot(k)
    }

    /// Flip the identified slot back to `EMPTY`.  Blobs are not reclaimed;
    /// content shared with other slots stays readable through them.
    pub fn delete(&mut self, img_id: &str) -> Result<()> {
        if img_id.is_empty() {
            return Err(ImgfsError::InvalidArgument);
        }
        let index = self.find_by_id(img_id).ok_or(ImgfsError::NotFound)?;

        self.slots[index].is_valid = EMPTY;
        self.write_slot(index)?;

        self.header.nb_files -= 1;
        self.header.version += 1;
        self.write_header()
    }

    /// Return the blob bytes of `img_id` at `resolution`, materializing a
    /// missing derived resolution on first touch.
    pub fn read(&mut self, img_id: &str, resolution: Resolution) -> Result<Vec<u8>> {
        if img_id.is_empty() {
            return Err(ImgfsError::InvalidArgument);
        }
        if self.header.nb_files == 0 {
            return Err(ImgfsError::NotFound);
        }
        let index = self.find_by_id(img_id).ok_or(ImgfsError::NotFound)?;

        let r = resolution.index();
        if self.slots[index].offset[r] == 0 || self.slots[index].size[r] == 0 {
            if resolution == Resolution::Orig {
                // Original blob always present for valid slots; treat a
                // violated store as not-found.
                return Err(ImgfsError::NotFound);
            }
            resize::lazily_resize(resolution, self, index)?;
        }

        let offset = self.slots[index].offset[r];
        let size = self.slots[index].size[r];
        self.read_blob(offset, size)
    }

    /// List the store contents.  `Stdout` prints and returns `None`; `Json`
    /// returns the `{"Images":[...]}` payload with identifiers in ascending
    /// slot order.
    pub fn list(&self, mode: ListMode) -> Result<Option<String>> {
        match mode {
            ListMode::Stdout => {
                self.header.print();
                if self.header.nb_files == 0 {
                    println!("<< empty imgFS >>");
                } else {
                    for slot in self.slots.iter().filter(|s| !s.is_empty()) {
                        slot.print();
                    }
                }
                Ok(None)
            }
            ListMode::Json => {
                let payload = ImageList {
                    images: self
                        .slots
                        .iter()
                        .filter(|s| !s.is_empty())
                        .map(|s| s.img_id_str().to_owned())
                        .collect(),
                };
                let json = serde_json::to_string(&payload)
                    .map_err(|_| ImgfsError::Runtime)?;
                Ok(Some(json))
            }
        }
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// Current byte length of the store file.
    pub fn file_len(&mut self) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }
}

/// Identifier acceptable for the store: non-empty, within `MAX_IMG_ID`
/// bytes.  Used by front-ends that reject rather than truncate.
pub fn valid_img_id(img_id: &str) -> bool {
    !img_id.is_empty() && img_id.len() <= MAX_IMG_ID
}
