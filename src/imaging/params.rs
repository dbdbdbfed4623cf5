//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the gallery transforms (which decide what images to
//! create) and the [`backend`](super::backend) (which does the actual pixel
//! work). This separation allows swapping backends (e.g. for testing with a
//! mock) without changing transform logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters (sigma + threshold) for thumbnail crispness.
//! - [`ThumbnailSize`]: Configured bounding box: `200`, `"200x150"`, `"200x"` or `"x150"`.
//! - [`ThumbnailParams`]: Full specification for a thumbnail: source, output, final dimensions, quality, optional sharpening.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening suitable for thumbnails.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Thumbnail bounding box. A missing side is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SizeRepr")]
pub struct ThumbnailSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Edge(u32),
    Text(String),
}

impl ThumbnailSize {
    /// Square box of `edge` pixels.
    pub fn square(edge: u32) -> Self {
        Self {
            width: Some(edge),
            height: Some(edge),
        }
    }

    /// Parse `N`, `WxH`, `Wx` or `xH`. Zero sides are rejected.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let side = |part: &str| -> Result<Option<u32>, String> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            match part.parse::<u32>() {
                Ok(0) => Err(format!("thumbnail size `{s}` has a zero side")),
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(format!("invalid thumbnail size `{s}`")),
            }
        };

        let size = match s.split_once(['x', 'X']) {
            Some((w, h)) => Self {
                width: side(w)?,
                height: side(h)?,
            },
            None => match side(s)? {
                Some(n) => Self::square(n),
                None => return Err("thumbnail size is empty".into()),
            },
        };
        if size.width.is_none() && size.height.is_none() {
            return Err(format!("thumbnail size `{s}` needs at least one side"));
        }
        Ok(size)
    }
}

impl TryFrom<SizeRepr> for ThumbnailSize {
    type Error = String;

    fn try_from(repr: SizeRepr) -> Result<Self, Self::Error> {
        match repr {
            SizeRepr::Edge(0) => Err("thumbnail size must be non-zero".into()),
            SizeRepr::Edge(n) => Ok(Self::square(n)),
            SizeRepr::Text(s) => Self::parse(&s),
        }
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        write!(f, "{}x{}", side(self.width), side(self.height))
    }
}

/// Parameters for a thumbnail operation.
///
/// `width`/`height` are the final output dimensions, already computed by
/// the caller. With `crop` the source is resized to cover them and
/// center-cropped; without it the source is resized exactly (aspect ratio
/// is preserved by the caller's fit calculation).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub crop: bool,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}
