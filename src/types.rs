//! Shared types for the content pipeline.
//!
//! A [`ContentObject`] is deliberately loosely typed: its public face is an
//! ordered JSON map, because sidecar documents and transforms can add or
//! override arbitrary keys, and the manifests expose whatever subset of keys
//! the collection config asks for. The few things the pipeline itself relies
//! on (source file, id, output directory) are kept as typed fields next to the
//! map so a sidecar overriding `path` or `filename` changes what the manifests
//! say, never which file gets copied.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// An ordered attribute map: object fields, transform updates, manifest entries.
pub type Attributes = Map<String, Value>;

/// Field names written by the pipeline itself.
pub mod fields {
    pub const PATH: &str = "path";
    pub const FILENAME: &str = "filename";
    pub const MTIME: &str = "mtime";
    pub const CTIME: &str = "ctime";
    pub const ID: &str = "id";
    pub const OBJECT_DIR: &str = "obj_dir";
    pub const URL: &str = "url";
    pub const DETAIL_JSON_PATH: &str = "obj_detail_json_path";
    pub const IMAGE: &str = "image";
    pub const THUMBNAIL: &str = "thumbnail";
}

/// One pipeline-managed unit derived from a single source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentObject {
    #[serde(skip)]
    source: PathBuf,
    #[serde(skip)]
    id: Option<u64>,
    #[serde(skip)]
    object_dir: Option<PathBuf>,
    #[serde(flatten)]
    fields: Attributes,
}

impl ContentObject {
    /// An object for `source` with no attributes yet.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            id: None,
            object_dir: None,
            fields: Attributes::new(),
        }
    }

    /// The source file this object was built from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Base name of the source file, which is also the name of the copied asset.
    pub fn source_file_name(&self) -> Option<&std::ffi::OsStr> {
        self.source.file_name()
    }

    /// Positional id, once assigned by the manifest writer.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Output directory, once assigned by the manifest writer.
    pub fn object_dir(&self) -> Option<&Path> {
        self.object_dir.as_deref()
    }

    pub(crate) fn set_placement(&mut self, id: u64, object_dir: PathBuf) {
        self.id = Some(id);
        self.object_dir = Some(object_dir);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Merge `updates` into the object. Keys in `updates` win.
    pub fn merge(&mut self, updates: Attributes) {
        for (key, value) in updates {
            self.fields.insert(key, value);
        }
    }

    pub fn fields(&self) -> &Attributes {
        &self.fields
    }

    /// Reduce the object to the requested attributes.
    ///
    /// Keys keep the object's own field order. Requested names the object
    /// does not carry are left out rather than reported.
    pub fn select(&self, attributes: &[String]) -> Attributes {
        self.fields
            .iter()
            .filter(|(key, _)| attributes.iter().any(|a| a == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// File name of every manifest document, aggregate and per-object.
pub const INDEX_FILENAME: &str = "index.json";

/// The ordered sequence of objects generated for one collection config.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub objects: Vec<ContentObject>,
    /// Attributes exposed in the aggregate `index.json`.
    pub list_attributes: Vec<String>,
    /// Attributes exposed in each per-object `index.json`.
    pub detail_attributes: Vec<String>,
    /// `output_dir/api_namespace/name`.
    pub base_path: PathBuf,
}

impl Collection {
    /// Path of the aggregate document.
    pub fn index_path(&self) -> PathBuf {
        self.base_path.join(INDEX_FILENAME)
    }
}
