//! Shared test utilities for the mypoint test suite.
//!
//! Provides file fixtures (empty files, small real JPEGs and PNGs, images
//! carrying an EXIF orientation tag, YAML sidecars) and readers for the JSON
//! documents the pipeline writes.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_test_jpeg(&tmp.path().join("a.jpg"), 40, 30);
//! write_jpeg_with_orientation(&tmp.path().join("b.jpg"), 40, 30, 6);
//! write_sidecar(&tmp.path().join("a.jpg"), "title: Dawn\n");
//!
//! let index = read_json(&out.join("api/photos/index.json"));
//! ```

use image::{ImageEncoder, RgbImage};
use serde_json::Value;
use std::path::Path;

// =========================================================================
// Plain files
// =========================================================================

/// Create an empty file, making parent directories as needed.
pub fn touch(path: &Path) {
    write_bytes(path, b"");
}

pub fn write_bytes(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Write the YAML sidecar for `asset` (`<asset>.yaml`).
pub fn write_sidecar(asset: &Path, yaml: &str) {
    let mut name = asset.as_os_str().to_owned();
    name.push(".yaml");
    write_bytes(Path::new(&name), yaml.as_bytes());
}

/// Parse a JSON file written by the pipeline. Panics with the path on failure.
pub fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
}

// =========================================================================
// Images
// =========================================================================

/// Encode a small gradient JPEG in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Create a small valid JPEG file with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    write_bytes(path, &jpeg_bytes(width, height));
}

/// Create a JPEG whose APP1 segment carries `orientation`.
pub fn write_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u16) {
    write_bytes(path, &with_exif_segment(&jpeg_bytes(width, height), orientation));
}

/// Minimal TIFF block: header, IFD0 with a single Orientation entry, no next IFD.
pub fn exif_block(orientation: u16, big_endian: bool) -> Vec<u8> {
    let u16b = |v: u16| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let u32b = |v: u32| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };

    let mut block = Vec::new();
    block.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    block.extend_from_slice(&u16b(42));
    block.extend_from_slice(&u32b(8)); // IFD0 right after the header
    block.extend_from_slice(&u16b(1)); // entry count
    block.extend_from_slice(&u16b(0x0112)); // Orientation
    block.extend_from_slice(&u16b(3)); // SHORT
    block.extend_from_slice(&u32b(1)); // count
    block.extend_from_slice(&u16b(orientation));
    block.extend_from_slice(&[0, 0]); // value field padding
    block.extend_from_slice(&u32b(0)); // no next IFD
    block
}

/// Insert an APP1 `Exif` segment right after the SOI marker of `jpeg`.
pub fn with_exif_segment(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&exif_block(orientation, false));
    let seg_len = u16::try_from(payload.len() + 2).unwrap();

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Encode a small gradient PNG in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Insert an `eXIf` chunk holding `body` right after the PNG's IHDR chunk.
pub fn with_png_exif(png: &[u8], body: &[u8]) -> Vec<u8> {
    assert_eq!(&png[1..4], b"PNG", "not a PNG");
    let ihdr_end = 8 + 8 + 13 + 4; // signature, IHDR header, IHDR data, CRC
    let mut chunk = u32::try_from(body.len()).unwrap().to_be_bytes().to_vec();
    chunk.extend_from_slice(b"eXIf");
    chunk.extend_from_slice(body);
    chunk.extend_from_slice(&crc32(&chunk[4..]).to_be_bytes());

    let mut out = png[..ihdr_end].to_vec();
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&png[ihdr_end..]);
    out
}

/// Create a PNG whose `eXIf` chunk carries `orientation`.
pub fn write_png_with_orientation(path: &Path, width: u32, height: u32, orientation: u16) {
    let png = with_png_exif(&png_bytes(width, height), &exif_block(orientation, false));
    write_bytes(path, &png);
}

/// RIFF/WEBP container with a VP8X header chunk followed by an `EXIF` chunk.
///
/// No image data: enough for metadata parsing, not for decoding.
pub fn webp_with_exif(body: &[u8]) -> Vec<u8> {
    let mut chunks = b"VP8X".to_vec();
    chunks.extend_from_slice(&10u32.to_le_bytes());
    chunks.extend_from_slice(&[0x08, 0, 0, 0, 0, 0, 0, 0, 0, 0]); // EXIF flag, 1x1 canvas
    chunks.extend_from_slice(b"EXIF");
    chunks.extend_from_slice(&u32::try_from(body.len()).unwrap().to_le_bytes());
    chunks.extend_from_slice(body);
    if body.len() % 2 == 1 {
        chunks.push(0);
    }

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&u32::try_from(chunks.len() + 4).unwrap().to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend_from_slice(&chunks);
    out
}

/// CRC-32 (ISO-HDLC) as PNG chunk trailers use it.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}
