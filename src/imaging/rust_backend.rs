//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders, format sniffed) |
//! | Identify | `image::image_dimensions` |
//! | Orientation tag | custom `exif_parser` (JPEG APP1, TIFF, PNG `eXIf`, WebP `EXIF`) |
//! | Transpose | `fliph` / `flipv` / `rotate*` on `DynamicImage` |
//! | Thumbnail fit | `resize_exact` with `Lanczos3` |
//! | Thumbnail crop | `resize_exact` to fill, then `crop_imm` centered |
//! | Sharpening | `image::imageops::unsharpen` |
//! | Encode | by output extension: JPEG (quality), PNG, TIFF, lossless WebP |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_fill_dimensions, center_crop_offset};
use super::orientation::{Orientation, Transpose, apply_all};
use super::params::{Quality, ThumbnailParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};

/// Quality used when an asset is rewritten in place.
const REWRITE_QUALITY: u32 = 90;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let encode_err =
        |e: image::ImageError| BackendError::ProcessingFailed(format!("Encode failed: {}", e));

    match ext.as_str() {
        "jpg" | "jpeg" => save_jpeg(img, path, quality),
        "png" => img.save_with_format(path, ImageFormat::Png).map_err(encode_err),
        "tif" | "tiff" => img
            .save_with_format(path, ImageFormat::Tiff)
            .map_err(encode_err),
        // The WebP encoder is lossless-only and wants 8-bit RGB(A).
        "webp" => DynamicImage::ImageRgba8(img.to_rgba8())
            .save_with_format(path, ImageFormat::WebP)
            .map_err(encode_err),
        other => Err(BackendError::UnsupportedFormat(other.to_string())),
    }
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let rgb = img.to_rgb8();
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = std::io::BufWriter::new(file);
    JpegEncoder::new_with_quality(writer, quality.value() as u8)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

/// Sibling path used while rewriting `path`; keeps the extension.
fn rewrite_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".rewrite-{name}"))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn read_orientation(&self, path: &Path) -> Result<Option<Orientation>, BackendError> {
        super::exif_parser::read_orientation(path).map_err(|e| match e {
            super::exif_parser::ExifError::Io(io) => BackendError::Io(io),
            other => BackendError::ProcessingFailed(format!(
                "Failed to read orientation from {}: {}",
                path.display(),
                other
            )),
        })
    }

    fn transpose(&self, path: &Path, ops: &[Transpose]) -> Result<(), BackendError> {
        if ops.is_empty() {
            return Ok(());
        }
        let img = apply_all(load_image(path)?, ops);

        // Write next to the original, then swap it in.
        let tmp = rewrite_path(path);
        if let Err(e) = save_image(&img, &tmp, Quality::new(REWRITE_QUALITY)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, path).map_err(BackendError::Io)
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let target = (params.width, params.height);

        let resized = if params.crop {
            // Fill-resize then center-crop to exact dimensions
            let (fill_w, fill_h) = calculate_fill_dimensions((img.width(), img.height()), target);
            let filled = img.resize_exact(fill_w, fill_h, FilterType::Lanczos3);
            let (x, y) = center_crop_offset((fill_w, fill_h), target);
            filled.crop_imm(x, y, params.width, params.height)
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };

        // Apply sharpening if requested
        let final_img = if let Some(sharpening) = params.sharpening {
            DynamicImage::from(image::imageops::unsharpen(
                &resized,
                sharpening.sigma,
                sharpening.threshold,
            ))
        } else {
            resized
        };

        save_image(&final_img, &params.output, params.quality)
    }
}
