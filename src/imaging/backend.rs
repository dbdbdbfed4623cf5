//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the gallery
//! transforms need: identify, read_orientation, transpose, and thumbnail.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::orientation::{Orientation, Transpose};
use super::params::ThumbnailParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Read the EXIF orientation tag. `Ok(None)` when the file has none.
    fn read_orientation(&self, path: &Path) -> Result<Option<Orientation>, BackendError>;

    /// Apply `ops` in order and overwrite the file at `path` with the result.
    fn transpose(&self, path: &Path, ops: &[Transpose]) -> Result<(), BackendError>;

    /// Execute a thumbnail operation (fit, or fill + center crop).
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Mock backend that records operations instead of touching pixels.
    ///
    /// Thumbnails are written as empty placeholder files so callers that
    /// copy or link them keep working. Uses Mutex (not RefCell) so it is
    /// Sync and works with rayon's par_iter.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub orientations: Mutex<HashMap<PathBuf, Result<Option<Orientation>, String>>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(PathBuf),
        ReadOrientation(PathBuf),
        Transpose {
            path: PathBuf,
            ops: Vec<Transpose>,
        },
        Thumbnail {
            source: PathBuf,
            output: PathBuf,
            width: u32,
            height: u32,
            crop: bool,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::with_dimensions(Dimensions {
                width: 800,
                height: 600,
            })
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dimensions: Dimensions) -> Self {
            Self {
                dimensions,
                orientations: Mutex::new(HashMap::new()),
                operations: Mutex::new(Vec::new()),
            }
        }

        /// Report `orientation` for `path`.
        pub fn set_orientation(&self, path: &Path, orientation: Orientation) {
            self.orientations
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), Ok(Some(orientation)));
        }

        /// Fail orientation reads for `path`.
        pub fn fail_orientation(&self, path: &Path, message: &str) {
            self.orientations
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), Err(message.to_string()));
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_path_buf()));
            Ok(self.dimensions)
        }

        fn read_orientation(&self, path: &Path) -> Result<Option<Orientation>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::ReadOrientation(path.to_path_buf()));
            match self.orientations.lock().unwrap().get(path) {
                None => Ok(None),
                Some(Ok(o)) => Ok(*o),
                Some(Err(message)) => Err(BackendError::ProcessingFailed(message.clone())),
            }
        }

        fn transpose(&self, path: &Path, ops: &[Transpose]) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Transpose {
                path: path.to_path_buf(),
                ops: ops.to_vec(),
            });
            Ok(())
        }

        fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Thumbnail {
                source: params.source.clone(),
                output: params.output.clone(),
                width: params.width,
                height: params.height,
                crop: params.crop,
            });
            std::fs::write(&params.output, b"")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 640,
            height: 480,
        });
        let dims = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(dims.width, 640);
        assert_eq!(dims.height, 480);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify("/test/image.jpg".into())]);
    }

    #[test]
    fn mock_orientation_defaults_to_none() {
        let backend = MockBackend::new();
        assert_eq!(
            backend.read_orientation(Path::new("/a.jpg")).unwrap(),
            None
        );
    }

    #[test]
    fn mock_orientation_can_fail() {
        let backend = MockBackend::new();
        backend.fail_orientation(Path::new("/a.jpg"), "truncated");
        assert!(backend.read_orientation(Path::new("/a.jpg")).is_err());
    }
}
