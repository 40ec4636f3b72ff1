//! Store header — format anchor at offset 0.
//!
//! # On-disk layout (64 bytes, all integer fields little-endian)
//!
//! ```text
//! Offset  Size  Field
//!    0     32   name          ASCII tag, NUL-padded ("EPFL ImgFS 2024")
//!   32      4   version       bumped on every committed insert/delete (LE u32)
//!   36      4   nb_files      count of NON_EMPTY slots (LE u32)
//!   40      4   max_files     slot-table capacity, frozen at creation (LE u32)
//!   44      8   resized_res   [thumb_w, thumb_h, small_w, small_h] (4 × LE u16)
//!   52      4   unused_32     reserved, written as zero
//!   56      8   unused_64     reserved, written as zero
//! ```
//!
//! The slot table starts at offset 64 and runs for `max_files` entries; the
//! blob region begins right after it.  `version` is NOT bumped by lazy
//! resizing — derived blobs are a cache, not logical content.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::metadata::Resolution;

/// Container kind tag stored in `name`.
pub const IMGFS_NAME: &str = "EPFL ImgFS 2024";
/// Fixed byte length of the `name` field (31 ASCII chars + NUL).
pub const MAX_IMGFS_NAME: usize = 31;
/// Fixed on-disk size of the header.
pub const HEADER_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name:        [u8; MAX_IMGFS_NAME + 1],
    pub version:     u32,
    pub nb_files:    u32,
    pub max_files:   u32,
    /// `[thumb_w, thumb_h, small_w, small_h]`, frozen at creation.
    pub resized_res: [u16; 4],
    pub unused_32:   u32,
    pub unused_64:   u64,
}

impl Header {
    pub fn new(max_files: u32, thumb_res: (u16, u16), small_res: (u16, u16)) -> Self {
        let mut name = [0u8; MAX_IMGFS_NAME + 1];
        name[..IMGFS_NAME.len()].copy_from_slice(IMGFS_NAME.as_bytes());
        Self {
            name,
            version:     0,
            nb_files:    0,
            max_files,
            resized_res: [thumb_res.0, thumb_res.1, small_res.0, small_res.1],
            unused_32:   0,
            unused_64:   0,
        }
    }

    /// Write the 64-byte header.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&self.name)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.nb_files)?;
        w.write_u32::<LittleEndian>(self.max_files)?;
        for r in &self.resized_res {
            w.write_u16::<LittleEndian>(*r)?;
        }
        w.write_u32::<LittleEndian>(self.unused_32)?;
        w.write_u64::<LittleEndian>(self.unused_64)
    }

    /// Read the 64-byte header.
    pub fn read<R: Read>(mut r: R) -> io::Result<Self> {
        let mut name = [0u8; MAX_IMGFS_NAME + 1];
        r.read_exact(&mut name)?;
        let version   = r.read_u32::<LittleEndian>()?;
        let nb_files  = r.read_u32::<LittleEndian>()?;
        let max_files = r.read_u32::<LittleEndian>()?;
        let mut resized_res = [0u16; 4];
        for slot in &mut resized_res {
            *slot = r.read_u16::<LittleEndian>()?;
        }
        let unused_32 = r.read_u32::<LittleEndian>()?;
        let unused_64 = r.read_u64::<LittleEndian>()?;
        Ok(Self { name, version, nb_files, max_files, resized_res, unused_32, unused_64 })
    }

    /// `name` without trailing NUL padding.
    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Target width for a derived resolution.
    pub fn resized_width(&self, res: Resolution) -> u16 {
        self.resized_res[2 * res.index()]
    }

    /// Target height for a derived resolution.
    pub fn resized_height(&self, res: Resolution) -> u16 {
        self.resized_res[2 * res.index() + 1]
    }

    /// Header banner for the STDOUT listing.
    pub fn print(&self) {
        println!("*****************************************");
        println!("********** IMGFS HEADER START ***********");
        println!("TYPE: {:<31}", self.name_str());
        println!("VERSION: {}", self.version);
        println!("IMAGE COUNT: {}\t\tMAX IMAGES: {}", self.nb_files, self.max_files);
        println!(
            "THUMBNAIL: {} x {}\tSMALL: {} x {}",
            self.resized_res[0], self.resized_res[1],
            self.resized_res[2], self.resized_res[3],
        );
        println!("*********** IMGFS HEADER END ************");
        println!("*****************************************");
    }
}
