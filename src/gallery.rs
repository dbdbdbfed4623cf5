//! Gallery transforms: image URL, orientation normalization, thumbnails.
//!
//! The gallery chain runs three pre-save transforms, in this order:
//!
//! | Transform | Update | Side effect |
//! |---|---|---|
//! | `set_attributes` | `image` URL of the copied asset | none |
//! | `normalize_orientation` | none | rewrites an EXIF-rotated source upright, in place |
//! | `generate_thumbnail` | `thumbnail` URL | writes `<obj_dir>/thumbnail.<ext>` |
//!
//! Orientation runs before the thumbnail so the thumbnail is derived from
//! upright pixels, and before the asset copy so the published asset is too.
//!
//! ## Arguments
//!
//! The only gallery argument is an optional `thumbnail` table:
//!
//! ```toml
//! [apis.thumbnail]
//! size = 200        # required: N, "WxH", "Wx" or "xH"
//! crop = false      # fill + center crop instead of fit
//! quality = 90      # JPEG quality, 1-100
//! sharpen = false   # light unsharp mask
//! ```
//!
//! Without it `generate_thumbnail` is a no-op.

use crate::imaging::{
    ImageBackend, Quality, Sharpening, ThumbnailParams, ThumbnailSize, crop_dimensions, fit_within,
};
use crate::transform::{Transform, TransformArgs, TransformChain, TransformError};
use crate::types::{Attributes, ContentObject, fields};
use crate::urls::UrlResolver;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Base name of the derived thumbnail; the source extension is appended.
pub const THUMBNAIL_STEM: &str = "thumbnail";

/// Parsed gallery plugin arguments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryArgs {
    pub thumbnail: Option<ThumbnailSpec>,
}

/// The `thumbnail` block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailSpec {
    pub size: ThumbnailSize,
    #[serde(default)]
    pub crop: bool,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default)]
    pub sharpen: bool,
}

fn default_quality() -> u32 {
    Quality::default().value()
}

impl GalleryArgs {
    /// Parse and check the per-collection arguments.
    pub fn from_args(args: &TransformArgs) -> Result<Self, String> {
        let parsed: Self =
            serde_json::from_value(Value::Object(args.clone())).map_err(|e| e.to_string())?;
        match &parsed.thumbnail {
            Some(spec) if !(1..=100).contains(&spec.quality) => Err(format!(
                "thumbnail.quality must be 1-100, got {}",
                spec.quality
            )),
            _ => Ok(parsed),
        }
    }
}

/// Where the copied asset of `object` lives in the output tree.
fn asset_path(object: &ContentObject) -> Result<PathBuf, TransformError> {
    match (object.object_dir(), object.source_file_name()) {
        (Some(dir), Some(name)) => Ok(dir.join(name)),
        _ => Err(TransformError::MissingObjectDir),
    }
}

// ============================================================================
// set_attributes
// ============================================================================

/// Sets `image` to the URL of the copied asset.
pub struct SetAttributes {
    urls: UrlResolver,
}

impl SetAttributes {
    pub fn new(urls: UrlResolver) -> Self {
        Self { urls }
    }
}

impl Transform for SetAttributes {
    fn name(&self) -> &'static str {
        "set_attributes"
    }

    fn apply(
        &self,
        object: &ContentObject,
        _args: &TransformArgs,
    ) -> Result<Attributes, TransformError> {
        let url = self.urls.resolve(&asset_path(object)?)?;
        let mut updates = Attributes::new();
        updates.insert(fields::IMAGE.into(), Value::String(url));
        Ok(updates)
    }
}

// ============================================================================
// normalize_orientation
// ============================================================================

/// Rewrites the source file upright according to its EXIF orientation.
///
/// A missing or unreadable tag leaves the file untouched. A failure while
/// rewriting is a real error.
pub struct NormalizeOrientation {
    backend: Arc<dyn ImageBackend>,
}

impl NormalizeOrientation {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

impl Transform for NormalizeOrientation {
    fn name(&self) -> &'static str {
        "normalize_orientation"
    }

    fn apply(
        &self,
        object: &ContentObject,
        _args: &TransformArgs,
    ) -> Result<Attributes, TransformError> {
        let source = object.source();
        match self.backend.read_orientation(source) {
            Ok(Some(orientation)) if !orientation.is_identity() => {
                debug!(
                    "{}: orientation {} → {:?}",
                    source.display(),
                    orientation.value(),
                    orientation.operations()
                );
                self.backend.transpose(source, orientation.operations())?;
            }
            Ok(Some(_)) => {}
            Ok(None) => debug!("{}: no orientation tag", source.display()),
            Err(e) => warn!(
                "{}: orientation unreadable, leaving as is: {}",
                source.display(),
                e
            ),
        }
        Ok(Attributes::new())
    }
}

// ============================================================================
// generate_thumbnail
// ============================================================================

/// Derives `thumbnail.<ext>` in the object directory and sets `thumbnail`.
pub struct GenerateThumbnail {
    urls: UrlResolver,
    backend: Arc<dyn ImageBackend>,
}

impl GenerateThumbnail {
    pub fn new(urls: UrlResolver, backend: Arc<dyn ImageBackend>) -> Self {
        Self { urls, backend }
    }
}

impl Transform for GenerateThumbnail {
    fn name(&self) -> &'static str {
        "generate_thumbnail"
    }

    fn apply(
        &self,
        object: &ContentObject,
        args: &TransformArgs,
    ) -> Result<Attributes, TransformError> {
        let gallery = GalleryArgs::from_args(args).map_err(TransformError::InvalidArgs)?;
        let Some(spec) = gallery.thumbnail else {
            return Ok(Attributes::new());
        };
        let dir = object.object_dir().ok_or(TransformError::MissingObjectDir)?;

        let source = object.source();
        let output = match source.extension() {
            Some(ext) => dir.join(format!("{THUMBNAIL_STEM}.{}", ext.to_string_lossy())),
            None => dir.join(THUMBNAIL_STEM),
        };

        let (width, height) = if spec.crop {
            crop_dimensions(spec.size)
        } else {
            let dims = self.backend.identify(source)?;
            fit_within((dims.width, dims.height), spec.size)
        };

        self.backend.thumbnail(&ThumbnailParams {
            source: source.to_path_buf(),
            output: output.clone(),
            width,
            height,
            crop: spec.crop,
            quality: Quality::new(spec.quality),
            sharpening: spec.sharpen.then(Sharpening::light),
        })?;
        debug!(
            "{}: thumbnail {}x{} → {}",
            source.display(),
            width,
            height,
            output.display()
        );

        let mut updates = Attributes::new();
        updates.insert(
            fields::THUMBNAIL.into(),
            Value::String(self.urls.resolve(&output)?),
        );
        Ok(updates)
    }
}

/// The gallery pre-save chain.
pub fn gallery_chain(urls: &UrlResolver, backend: Arc<dyn ImageBackend>) -> TransformChain {
    TransformChain::new()
        .with_pre_save(SetAttributes::new(urls.clone()))
        .with_pre_save(NormalizeOrientation::new(backend.clone()))
        .with_pre_save(GenerateThumbnail::new(urls.clone(), backend))
}
