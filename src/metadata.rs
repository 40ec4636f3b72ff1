//! Metadata slots — one fixed-size entry per stored image.
//!
//! # On-disk layout (208 bytes per slot, all integer fields little-endian)
//!
//! ```text
//! Offset  Size  Field
//!    0    128   img_id     ASCII identifier, NUL-padded (≤ MAX_IMG_ID chars)
//!  128     32   sha        SHA-256 of the original-resolution bytes
//!  160      8   orig_res   original width, height (2 × LE u32)
//!  168     12   size       blob byte length per resolution (3 × LE u32)
//!  180     24   offset     absolute blob offset per resolution (3 × LE u64)
//!  204      2   is_valid   EMPTY (0) or NON_EMPTY (1)  (LE u16)
//!  206      2   unused_16  reserved, written as zero
//! ```
//!
//! Resolution order everywhere is `[thumb, small, orig]`.  A zero
//! offset/size pair means "blob absent"; for NON_EMPTY slots the orig pair
//! is always present.  Slot table offset of entry `i` is
//! `HEADER_SIZE + i * SLOT_SIZE`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Maximum identifier length in bytes; longer identifiers are truncated on
/// copy (silent, preserved behavior).
pub const MAX_IMG_ID: usize = 127;
/// Fixed on-disk size of one slot.
pub const SLOT_SIZE: usize = 208;
/// Number of resolutions kept per image.
pub const NB_RES: usize = 3;

pub const EMPTY: u16 = 0;
pub const NON_EMPTY: u16 = 1;

// ── Resolution ───────────────────────────────────────────────────────────────

/// One of the three kept resolutions; `index()` is the position in the
/// per-slot `size`/`offset` arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Thumb,
    Small,
    Orig,
}

impl Resolution {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Resolution::Thumb => 0,
            Resolution::Small => 1,
            Resolution::Orig  => 2,
        }
    }

    /// Parse the accepted spellings: `thumb`/`thumbnail`, `small`,
    /// `orig`/`original`.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "thumb" | "thumbnail" => Some(Resolution::Thumb),
            "small"               => Some(Resolution::Small),
            "orig" | "original"   => Some(Resolution::Orig),
            _                     => None,
        }
    }

    /// Filename suffix used by the CLI read command.
    pub fn suffix(self) -> &'static str {
        match self {
            Resolution::Thumb => "thumb",
            Resolution::Small => "small",
            Resolution::Orig  => "orig",
        }
    }
}

// ── Slot ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub img_id:    [u8; MAX_IMG_ID + 1],
    pub sha:       [u8; 32],
    /// Original image width, height in pixels.
    pub orig_res:  [u32; 2],
    /// Blob byte length per resolution; 0 = absent.
    pub size:      [u32; NB_RES],
    /// Absolute blob offset per resolution; 0 = absent.
    pub offset:    [u64; NB_RES],
    pub is_valid:  u16,
    pub unused_16: u16,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            img_id:    [0u8; MAX_IMG_ID + 1],
            sha:       [0u8; 32],
            orig_res:  [0; 2],
            size:      [0; NB_RES],
            offset:    [0; NB_RES],
            is_valid:  EMPTY,
            unused_16: 0,
        }
    }
}

impl Slot {
    /// Copy an identifier into the fixed field, truncating to `MAX_IMG_ID`
    /// bytes.  The remainder stays NUL-padded.
    pub fn set_img_id(&mut self, img_id: &str) {
        self.img_id = [0u8; MAX_IMG_ID + 1];
        let bytes = img_id.as_bytes();
        let n = bytes.len().min(MAX_IMG_ID);
        self.img_id[..n].copy_from_slice(&bytes[..n]);
    }

    /// Identifier without trailing NUL padding.
    pub fn img_id_str(&self) -> &str {
        let end = self.img_id.iter().position(|&b| b == 0).unwrap_or(self.img_id.len());
        std::str::from_utf8(&self.img_id[..end]).unwrap_or("")
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.is_valid == EMPTY
    }

    /// Write the 208-byte slot.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&self.img_id)?;
        w.write_all(&self.sha)?;
        for r in &self.orig_res {
            w.write_u32::<LittleEndian>(*r)?;
        }
        for s in &self.size {
            w.write_u32::<LittleEndian>(*s)?;
        }
        for o in &self.offset {
            w.write_u64::<LittleEndian>(*o)?;
        }
        w.write_u16::<LittleEndian>(self.is_valid)?;
        w.write_u16::<LittleEndian>(self.unused_16)
    }

    /// Read the 208-byte slot.
    pub fn read<R: Read>(mut r: R) -> io::Result<Self> {
        let mut slot = Slot::default();
        r.read_exact(&mut slot.img_id)?;
        r.read_exact(&mut slot.sha)?;
        for field in &mut slot.orig_res {
            *field = r.read_u32::<LittleEndian>()?;
        }
        for field in &mut slot.size {
            *field = r.read_u32::<LittleEndian>()?;
        }
        for field in &mut slot.offset {
            *field = r.read_u64::<LittleEndian>()?;
        }
        slot.is_valid  = r.read_u16::<LittleEndian>()?;
        slot.unused_16 = r.read_u16::<LittleEndian>()?;
        Ok(slot)
    }

    /// One metadata block of the STDOUT listing.
    pub fn print(&self) {
        println!("IMAGE ID: {}", self.img_id_str());
        println!("SHA: {}", hex::encode(self.sha));
        println!("VALID: {}", self.is_valid);
        println!("UNUSED: {}", self.unused_16);
        println!(
            "OFFSET ORIG. : {}\t\tSIZE ORIG. : {}",
            self.offset[Resolution::Orig.index()], self.size[Resolution::Orig.index()],
        );
        println!(
            "OFFSET THUMB.: {}\t\tSIZE THUMB.: {}",
            self.offset[Resolution::Thumb.index()], self.size[Resolution::Thumb.index()],
        );
        println!(
            "OFFSET SMALL : {}\t\tSIZE SMALL : {}",
            self.offset[Resolution::Small.index()], self.size[Resolution::Small.index()],
        );
        println!("ORIGINAL: {} x {}", self.orig_res[0], self.orig_res[1]);
        println!("*****************************************");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn slot_roundtrip() {
        let mut slot = Slot::default();
        slot.set_img_id("pic42");
        slot.sha = [0xAB; 32];
        slot.orig_res = [1920, 1080];
        slot.size = [0, 0, 5000];
        slot.offset = [0, 0, 896];
        slot.is_valid = NON_EMPTY;

        let mut buf = Vec::new();
        slot.write(&mut buf).unwrap();
        assert_eq!(buf.len(), SLOT_SIZE);

        let back = Slot::read(Cursor::new(&buf)).unwrap();
        assert_eq!(back.img_id_str(), "pic42");
        assert_eq!(back.sha, [0xAB; 32]);
        assert_eq!(back.orig_res, [1920, 1080]);
        assert_eq!(back.size, [0, 0, 5000]);
        assert_eq!(back.offset, [0, 0, 896]);
        assert_eq!(back.is_valid, NON_EMPTY);
    }

    #[test]
    fn img_id_truncated_to_max() {
        let long = "x".repeat(MAX_IMG_ID + 40);
        let mut slot = Slot::default();
        slot.set_img_id(&long);
        assert_eq!(slot.img_id_str().len(), MAX_IMG_ID);
    }

    #[test]
    fn resolution_names() {
        assert_eq!(Resolution::from_name("thumb"), Some(Resolution::Thumb));
        assert_eq!(Resolution::from_name("thumbnail"), Some(Resolution::Thumb));
        assert_eq!(Resolution::from_name("small"), Some(Resolution::Small));
        assert_eq!(Resolution::from_name("orig"), Some(Resolution::Orig));
        assert_eq!(Resolution::from_name("original"), Some(Resolution::Orig));
        assert_eq!(Resolution::from_name("huge"), None);
    }
}
