//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::ThumbnailSize;

/// Scale `source` down to fit inside `bounds`, preserving aspect ratio.
///
/// Unconstrained sides don't limit the scale. Never upscales: a source that
/// already fits is returned unchanged. Each side is at least 1px.
///
/// # Examples
/// ```
/// # use mypoint::imaging::{ThumbnailSize, fit_within};
/// // 800x600 into a 200px box → 200x150
/// assert_eq!(fit_within((800, 600), ThumbnailSize::square(200)), (200, 150));
/// ```
pub fn fit_within(source: (u32, u32), bounds: ThumbnailSize) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let mut scale: f64 = 1.0;
    if let Some(w) = bounds.width {
        scale = scale.min(w as f64 / src_w as f64);
    }
    if let Some(h) = bounds.height {
        scale = scale.min(h as f64 / src_h as f64);
    }

    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Final dimensions of a cropped thumbnail.
///
/// A box with both sides is used as-is. With one side missing the crop is
/// square on the given side.
pub fn crop_dimensions(bounds: ThumbnailSize) -> (u32, u32) {
    match (bounds.width, bounds.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(n), None) | (None, Some(n)) => (n, n),
        (None, None) => (1, 1),
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(tgt_h);
        (w, h)
    }
}

/// Top-left corner of a `target`-sized window centered in `filled`.
pub fn center_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: Option<u32>, h: Option<u32>) -> ThumbnailSize {
        ThumbnailSize {
            width: w,
            height: h,
        }
    }

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_within((800, 600), ThumbnailSize::square(200)), (200, 150));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_within((600, 800), ThumbnailSize::square(200)), (150, 200));
    }

    #[test]
    fn fit_width_only() {
        assert_eq!(fit_within((1000, 500), size(Some(100), None)), (100, 50));
    }

    #[test]
    fn fit_height_only() {
        assert_eq!(fit_within((1000, 500), size(None, Some(100))), (200, 100));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_within((120, 80), ThumbnailSize::square(200)), (120, 80));
    }

    #[test]
    fn fit_keeps_at_least_one_pixel() {
        assert_eq!(fit_within((4000, 10), size(Some(100), None)), (100, 1));
    }

    // =========================================================================
    // crop_dimensions tests
    // =========================================================================

    #[test]
    fn crop_uses_box() {
        assert_eq!(crop_dimensions(size(Some(300), Some(200))), (300, 200));
    }

    #[test]
    fn crop_single_side_is_square() {
        assert_eq!(crop_dimensions(size(Some(64), None)), (64, 64));
        assert_eq!(crop_dimensions(size(None, Some(48))), (48, 48));
    }

    // =========================================================================
    // calculate_fill_dimensions tests
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500 target
        // Source is wider, so height matches: 500, width = 500 * (4/3) = 667
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        // 600x800 (3:4) → 500x400 target
        // Source is taller, so width matches: 500, height = 500 * (4/3) = 667
        assert_eq!(calculate_fill_dimensions((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn fill_same_aspect_ratio() {
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn fill_square_source_to_portrait() {
        // 400x400 (1:1) → 200x300 target
        // Source is wider (1:1 > 2:3), height matches: 300, width = 300
        assert_eq!(calculate_fill_dimensions((400, 400), (200, 300)), (300, 300));
    }

    // =========================================================================
    // center_crop_offset tests
    // =========================================================================

    #[test]
    fn offset_centers_window() {
        assert_eq!(center_crop_offset((667, 500), (400, 500)), (133, 0));
        assert_eq!(center_crop_offset((500, 667), (500, 400)), (0, 133));
    }

    #[test]
    fn offset_is_zero_when_sizes_match() {
        assert_eq!(center_crop_offset((200, 200), (200, 200)), (0, 0));
    }
}
