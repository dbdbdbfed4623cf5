//! # mypoint
//!
//! A static content-gallery generator. Point it at a directory of media and a
//! `config.toml`, and it writes a tree of JSON documents plus copied assets
//! that any static file server can publish as a read-only API.
//!
//! # Architecture: Select → Transform → Persist
//!
//! Each `[[apis]]` entry in the config becomes one collection, built in three
//! stages:
//!
//! ```text
//! 1. Select     file_selectors  →  Vec<ContentObject>   (glob, metadata, sidecars, order)
//! 2. Transform  pre-save chain  →  object attributes    (URLs, orientation, thumbnails)
//! 3. Persist    collection      →  <output>/<api>/<name>/{index.json, <id>/...}
//! ```
//!
//! Selection is pure bookkeeping over the filesystem. Transforms are small
//! named units that read an object and return attributes to merge into it;
//! the plugin named in the config decides which transforms run. Persisting
//! assigns positional ids, writes one directory per object and finishes with
//! the aggregate index, which only appears once every object succeeded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `ContentObject` and `Collection`, the data every stage passes along |
//! | [`metadata`] | Filesystem fields and YAML sidecar overrides |
//! | [`select`] | Glob expansion and ordering |
//! | [`transform`] | The `Transform` trait and pre/post-save chains |
//! | [`gallery`] | Image transforms: URL, EXIF orientation, thumbnails |
//! | [`plugin`] | Closed registry mapping plugin names to argument checks and chains |
//! | [`manifest`] | Id placement, per-object output, aggregate index |
//! | [`urls`] | Output paths to public URLs |
//! | [`fingerprint`] | SHA-1 content fingerprints |
//! | [`config`] | `config.toml` loading, defaults and validation |
//! | [`imaging`] | Pure-Rust image operations behind the `ImageBackend` trait |
//! | [`site`] | Whole-site build: static files plus every collection |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Positional Ids
//!
//! Ids are 1-based positions in the final ordering, assigned before any
//! per-object work starts. Output paths are therefore fixed up front, and
//! objects can be processed in parallel without coordinating on names.
//!
//! ## Upright Copies
//!
//! Gallery images are rewritten with their EXIF orientation applied and the
//! tag dropped. Consumers never have to rotate anything, and regenerating over
//! already-normalized output is a no-op.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, resizing and
//! encoding, and reads EXIF orientation with a small bounds-checked parser.
//! No ImageMagick, no system libraries: the binary is self-contained.

pub mod config;
pub mod fingerprint;
pub mod gallery;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod plugin;
pub mod select;
pub mod site;
pub mod transform;
pub mod types;
pub mod urls;

#[cfg(test)]
pub(crate) mod test_helpers;
