//! Image dimensions from container headers, without decoding pixels.

use crate::error::{GeoError, Result};
use crate::geo::ImageSize;
use std::path::Path;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];
const SOF0: u8 = 0xC0;
const SOF2: u8 = 0xC2;

/// Read width/height from PNG or JPEG bytes.
pub fn dimensions(bytes: &[u8]) -> Result<ImageSize> {
    if bytes.starts_with(PNG_SIGNATURE) {
        png_dimensions(bytes)
    } else if bytes.starts_with(JPEG_SOI) {
        jpeg_dimensions(bytes)
    } else {
        Err(GeoError::UnsupportedImage)
    }
}

pub fn read_dimensions(path: &Path) -> Result<ImageSize> {
    let bytes = std::fs::read(path).map_err(|e| GeoError::io(path, e))?;
    dimensions(&bytes)
}

/// IHDR is always the first chunk; width and height sit at offsets 16 and 20.
fn png_dimensions(bytes: &[u8]) -> Result<ImageSize> {
    if bytes.get(12..16) != Some(b"IHDR".as_slice()) {
        return Err(GeoError::TruncatedImage);
    }
    let width = be_u32(bytes, 16)?;
    let height = be_u32(bytes, 20)?;
    ImageSize::new(width, height).ok_or(GeoError::TruncatedImage)
}

/// Walk marker segments until the first baseline or progressive frame header.
fn jpeg_dimensions(bytes: &[u8]) -> Result<ImageSize> {
    let mut pos = JPEG_SOI.len();
    loop {
        // Markers may be preceded by any number of 0xFF fill bytes.
        let start = pos;
        while bytes.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        if pos == start {
            return Err(GeoError::TruncatedImage);
        }
        let marker = *bytes.get(pos).ok_or(GeoError::TruncatedImage)?;
        pos += 1;

        match marker {
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD8 => continue,
            // End of image or start of scan before any frame header.
            0xD9 | 0xDA => return Err(GeoError::TruncatedImage),
            _ => {}
        }

        let length = usize::from(be_u16(bytes, pos)?);
        if length < 2 {
            return Err(GeoError::TruncatedImage);
        }
        if marker == SOF0 || marker == SOF2 {
            // length(2) precision(1) height(2) width(2)
            let height = be_u16(bytes, pos + 3)?;
            let width = be_u16(bytes, pos + 5)?;
            return ImageSize::new(u32::from(width), u32::from(height))
                .ok_or(GeoError::TruncatedImage);
        }
        pos += length;
    }
}

fn be_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let raw = bytes.get(at..at + 2).ok_or(GeoError::TruncatedImage)?;
    Ok(u16::from_be_bytes([raw[0], raw[1]]))
}

fn be_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let raw = bytes.get(at..at + 4).ok_or(GeoError::TruncatedImage)?;
    Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
