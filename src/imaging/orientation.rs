//! EXIF orientation: tag values and the pixel operations that undo them.
//!
//! Cameras store pixels in sensor order and record how the picture should be
//! displayed in EXIF tag `0x0112` (values 1–8). Normalizing applies the
//! operations below so the pixels themselves are upright:
//!
//! | Tag | Operations |
//! |---|---|
//! | 1 | none |
//! | 2 | flip horizontal |
//! | 3 | rotate 180 |
//! | 4 | flip vertical |
//! | 5 | flip horizontal, rotate 90 |
//! | 6 | rotate 270 |
//! | 7 | flip vertical, rotate 90 |
//! | 8 | rotate 90 |
//!
//! Rotations are **counter-clockwise**: `Rotate90` turns the image a quarter
//! turn to the left. The `image` crate's `rotate90` is clockwise, so the
//! mapping in [`Transpose::apply`] swaps the two quarter turns.

use image::DynamicImage;

/// A lossless geometric operation on an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    FlipHorizontal,
    FlipVertical,
    /// 90° counter-clockwise.
    Rotate90,
    Rotate180,
    /// 270° counter-clockwise (90° clockwise).
    Rotate270,
}

impl Transpose {
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::FlipHorizontal => img.fliph(),
            Self::FlipVertical => img.flipv(),
            Self::Rotate90 => img.rotate270(),
            Self::Rotate180 => img.rotate180(),
            Self::Rotate270 => img.rotate90(),
        }
    }

    /// The operation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::Rotate90 => Self::Rotate270,
            Self::Rotate270 => Self::Rotate90,
            other => other,
        }
    }
}

/// Apply `ops` left to right.
pub fn apply_all(img: DynamicImage, ops: &[Transpose]) -> DynamicImage {
    ops.iter().fold(img, |img, op| op.apply(img))
}

/// The sequence that undoes `ops`: reversed, each op inverted.
pub fn inverse_sequence(ops: &[Transpose]) -> Vec<Transpose> {
    ops.iter().rev().map(|op| op.inverse()).collect()
}

/// A valid EXIF orientation value (1–8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation(u8);

const SEQUENCES: [&[Transpose]; 8] = {
    use Transpose::*;
    [
        &[],
        &[FlipHorizontal],
        &[Rotate180],
        &[FlipVertical],
        &[FlipHorizontal, Rotate90],
        &[Rotate270],
        &[FlipVertical, Rotate90],
        &[Rotate90],
    ]
};

impl Orientation {
    /// `None` for values outside 1–8.
    pub fn from_tag(value: u16) -> Option<Self> {
        match value {
            1..=8 => Some(Self(value as u8)),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 1
    }

    /// Operations that bring an image with this tag upright.
    pub fn operations(self) -> &'static [Transpose] {
        SEQUENCES[usize::from(self.0 - 1)]
    }
}
