//! JPEG codec boundary.
//!
//! Pure byte-level operations over in-memory JPEG buffers: probe the pixel
//! dimensions, and produce a resized re-encoded copy.  Nothing here touches
//! the store file; the storage engine calls in with a blob and gets bytes or
//! dimensions back.  Codec failures surface as [`ImgfsError::ImgLib`].

use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

use crate::error::{ImgfsError, Result};

/// Width and height of a JPEG buffer, read from its headers without a full
/// decode.
pub fn get_resolution(image_buffer: &[u8]) -> Result<(u32, u32)> {
    ImageReader::with_format(Cursor::new(image_buffer), ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| ImgfsError::ImgLib(e.to_string()))
}

/// Decode `image_buffer`, shrink it to fit within `width`×`height` while
/// preserving aspect ratio, and re-encode as JPEG.
///
/// An image already smaller than the target box is still re-encoded — the
/// derived blob must exist on its own once materialized.
pub fn resize_jpeg(image_buffer: &[u8], width: u16, height: u16) -> Result<Vec<u8>> {
    let decoded = decode(image_buffer)?;
    let resized = decoded.thumbnail(u32::from(width), u32::from(height));

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| ImgfsError::ImgLib(e.to_string()))?;
    Ok(out.into_inner())
}

fn decode(image_buffer: &[u8]) -> Result<DynamicImage> {
    ImageReader::with_format(Cursor::new(image_buffer), ImageFormat::Jpeg)
        .decode()
        .map_err(|e| ImgfsError::ImgLib(e.to_string()))
}
