//! Minimal EXIF orientation reader for JPEG, TIFF, PNG and WebP files.
//!
//! Extracts one field: Orientation (tag `0x0112`, SHORT) from IFD0.
//!
//! | Container | Where the TIFF block lives |
//! |---|---|
//! | JPEG | APP1 marker, after the `Exif\0\0` header |
//! | TIFF | the file itself |
//! | PNG | `eXIf` chunk |
//! | WebP | `EXIF` RIFF chunk |
//!
//! PNG and WebP writers sometimes keep the JPEG-style `Exif\0\0` prefix in
//! the chunk; it is skipped when present. Any other format reports no
//! orientation.
//!
//! Absence is `Ok(None)`. Malformed data is an error so the caller can decide
//! whether to log it.

use super::orientation::Orientation;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("invalid TIFF header")]
    BadTiffHeader,
    #[error("orientation value {0} is outside 1-8")]
    InvalidOrientation(u16),
}

const ORIENTATION_TAG: u16 = 0x0112;
const TYPE_SHORT: u16 = 3;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Read the orientation tag from a file, dispatching on its magic bytes.
pub fn read_orientation(path: &Path) -> Result<Option<Orientation>, ExifError> {
    let bytes = std::fs::read(path)?;
    orientation_from_bytes(&bytes)
}

pub fn orientation_from_bytes(data: &[u8]) -> Result<Option<Orientation>, ExifError> {
    match data {
        [0xFF, 0xD8, ..] => orientation_from_jpeg(data),
        [b'I', b'I', 42, 0, ..] | [b'M', b'M', 0, 42, ..] => orientation_from_tiff(data),
        _ if data.starts_with(PNG_SIGNATURE) => exif_payload(find_png_exif(data)?),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
            exif_payload(find_webp_exif(data)?)
        }
        _ => Ok(None),
    }
}

/// Parse an Exif chunk body, with or without the `Exif\0\0` prefix.
fn exif_payload(chunk: Option<&[u8]>) -> Result<Option<Orientation>, ExifError> {
    match chunk {
        Some(body) => orientation_from_tiff(body.strip_prefix(EXIF_HEADER).unwrap_or(body)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// JPEG: locate the APP1 / Exif segment
// ---------------------------------------------------------------------------

fn orientation_from_jpeg(data: &[u8]) -> Result<Option<Orientation>, ExifError> {
    match find_jpeg_exif(data)? {
        Some(tiff) => orientation_from_tiff(tiff),
        None => Ok(None),
    }
}

/// Find the TIFF block inside a JPEG's APP1 Exif segment.
fn find_jpeg_exif(data: &[u8]) -> Result<Option<&[u8]>, ExifError> {
    let mut pos = 2; // past SOI
    loop {
        if pos + 1 >= data.len() {
            return Ok(None);
        }
        if data[pos] != 0xFF {
            return Err(ExifError::Truncated("JPEG marker stream"));
        }
        let marker = data[pos + 1];
        match marker {
            // Fill byte before a marker
            0xFF => {
                pos += 1;
                continue;
            }
            // SOS: image data starts, EOI: end. No Exif before either.
            0xDA | 0xD9 => return Ok(None),
            // Markers without length field
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        if pos + 4 > data.len() {
            return Err(ExifError::Truncated("JPEG segment header"));
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            return Err(ExifError::Truncated("JPEG segment header"));
        }
        let seg_end = pos + 2 + seg_len;
        if seg_end > data.len() {
            return Err(ExifError::Truncated("JPEG segment"));
        }

        let segment = &data[pos + 4..seg_end];
        if marker == 0xE1 && segment.starts_with(EXIF_HEADER) {
            return Ok(Some(&segment[EXIF_HEADER.len()..]));
        }
        pos = seg_end;
    }
}

// ---------------------------------------------------------------------------
// PNG and WebP: locate the Exif chunk
// ---------------------------------------------------------------------------

/// Walk PNG chunks (length, type, data, CRC) up to `IEND`.
fn find_png_exif(data: &[u8]) -> Result<Option<&[u8]>, ExifError> {
    let mut pos = PNG_SIGNATURE.len();
    while pos < data.len() {
        let header = data
            .get(pos..pos + 8)
            .ok_or(ExifError::Truncated("PNG chunk header"))?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = &header[4..8];
        let body_start = pos + 8;
        let body = body_start
            .checked_add(len)
            .and_then(|end| data.get(body_start..end))
            .ok_or(ExifError::Truncated("PNG chunk"))?;
        match kind {
            b"eXIf" => return Ok(Some(body)),
            b"IEND" => return Ok(None),
            _ => pos = body_start + len + 4,
        }
    }
    Ok(None)
}

/// Walk RIFF chunks (fourcc, little-endian size, data, pad to even).
fn find_webp_exif(data: &[u8]) -> Result<Option<&[u8]>, ExifError> {
    let mut pos = 12; // "RIFF" size "WEBP"
    while pos < data.len() {
        let header = data
            .get(pos..pos + 8)
            .ok_or(ExifError::Truncated("WebP chunk header"))?;
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let body_start = pos + 8;
        let body = body_start
            .checked_add(size)
            .and_then(|end| data.get(body_start..end))
            .ok_or(ExifError::Truncated("WebP chunk"))?;
        if &header[0..4] == b"EXIF" {
            return Ok(Some(body));
        }
        pos = body_start + size + (size & 1);
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// TIFF: walk IFD0 for the orientation entry
// ---------------------------------------------------------------------------

/// Bounds-checked reader over a TIFF block in either byte order.
struct TiffReader<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> TiffReader<'a> {
    fn new(data: &'a [u8]) -> Result<Self, ExifError> {
        if data.len() < 8 {
            return Err(ExifError::Truncated("TIFF header"));
        }
        let big_endian = match &data[0..2] {
            b"MM" => true,
            b"II" => false,
            _ => return Err(ExifError::BadTiffHeader),
        };
        let reader = Self { data, big_endian };
        if reader.u16(2)? != 42 {
            return Err(ExifError::BadTiffHeader);
        }
        Ok(reader)
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N], ExifError> {
        offset
            .checked_add(N)
            .and_then(|end| self.data.get(offset..end))
            .and_then(|s| s.try_into().ok())
            .ok_or(ExifError::Truncated("TIFF IFD"))
    }

    fn u16(&self, offset: usize) -> Result<u16, ExifError> {
        let b = self.bytes::<2>(offset)?;
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    fn u32(&self, offset: usize) -> Result<u32, ExifError> {
        let b = self.bytes::<4>(offset)?;
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }
}

fn orientation_from_tiff(data: &[u8]) -> Result<Option<Orientation>, ExifError> {
    let reader = TiffReader::new(data)?;
    let ifd_offset = reader.u32(4)? as usize;
    let entry_count = reader.u16(ifd_offset)? as usize;
    let entries_start = ifd_offset + 2;

    for i in 0..entry_count {
        let entry = entries_start + i * 12;
        let tag = reader.u16(entry)?;
        if tag != ORIENTATION_TAG {
            continue;
        }
        let typ = reader.u16(entry + 2)?;
        let count = reader.u32(entry + 4)?;
        if typ != TYPE_SHORT || count != 1 {
            return Err(ExifError::BadTiffHeader);
        }
        // A single SHORT sits left-aligned in the value field.
        let value = reader.u16(entry + 8)?;
        return Orientation::from_tag(value)
            .map(Some)
            .ok_or(ExifError::InvalidOrientation(value));
    }

    Ok(None)
}
