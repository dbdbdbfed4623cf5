//! Public URL derivation for generated files.
//!
//! Every URL in the manifests is derived the same way: take the path of the
//! generated file or directory relative to the output root, and if the site
//! has a `base_url`, join it onto that. Without a base URL the relative path
//! *is* the URL, so consumers must accept both forms.
//!
//! Joining follows RFC 3986 reference resolution (`url::Url::join`): a base of
//! `https://example.com/gallery/` keeps the `gallery/` segment, a base of
//! `https://example.com/gallery` replaces it.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("{} is not inside the output directory {}", path.display(), output_dir.display())]
    OutsideOutput { path: PathBuf, output_dir: PathBuf },
    #[error("cannot join {relative} onto base URL: {source}")]
    Join {
        relative: String,
        #[source]
        source: url::ParseError,
    },
}

/// Resolves output paths to public URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlResolver {
    output_dir: PathBuf,
    base_url: Option<Url>,
}

impl UrlResolver {
    pub fn new(output_dir: impl Into<PathBuf>, base_url: Option<Url>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_url,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `path` relative to the output root, `/`-separated on every platform.
    pub fn relative_path(&self, path: &Path) -> Result<String, UrlError> {
        let relative = path
            .strip_prefix(&self.output_dir)
            .map_err(|_| UrlError::OutsideOutput {
                path: path.to_path_buf(),
                output_dir: self.output_dir.clone(),
            })?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(segments.join("/"))
    }

    /// The public URL for `path`: the base URL joined with the relative
    /// path, or the bare relative path when no base URL is configured.
    pub fn resolve(&self, path: &Path) -> Result<String, UrlError> {
        let relative = self.relative_path(path)?;
        match &self.base_url {
            None => Ok(relative),
            Some(base) => base
                .join(&relative)
                .map(String::from)
                .map_err(|source| UrlError::Join { relative, source }),
        }
    }
}
