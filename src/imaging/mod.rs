//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **EXIF orientation** | custom parser (JPEG APP1, TIFF, PNG `eXIf`, WebP `EXIF`) |
//! | **Normalize orientation** | flips and quarter turns, re-encoded in place |
//! | **Thumbnail** | Lanczos3 fit or fill + center crop, optional `unsharpen` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Orientation**: EXIF tag values and their geometric operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub(crate) mod exif_parser;
pub mod orientation;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{crop_dimensions, fit_within};
pub use orientation::{Orientation, Transpose};
pub use params::{Quality, Sharpening, ThumbnailParams, ThumbnailSize};
pub use rust_backend::RustBackend;
