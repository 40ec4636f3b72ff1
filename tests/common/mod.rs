//! Shared test helpers: in-memory JPEG samples and scratch stores.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tempfile::NamedTempFile;

use imgfs::store::{CreateOptions, ImgFs};

/// Deterministic JPEG sample; different `seed` values give different
/// content (and therefore different digests).
pub fn sample_jpeg(w: u32, h: u32, seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([
            seed.wrapping_add((x % 251) as u8),
            seed.wrapping_mul(3).wrapping_add((y % 241) as u8),
            seed.wrapping_add(((x + y) % 239) as u8),
        ])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

/// Fresh store file with the given capacity and 64×64 / 256×256 derived
/// resolutions.  The `NamedTempFile` keeps the path alive for the test.
pub fn new_store(max_files: u32) -> (NamedTempFile, ImgFs) {
    let tmp = NamedTempFile::new().unwrap();
    let opts = CreateOptions {
        max_files,
        thumb_res: (64, 64),
        small_res: (256, 256),
    };
    let store = ImgFs::create(tmp.path(), &opts).unwrap();
    (tmp, store)
}
