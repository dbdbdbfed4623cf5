//! Site build: config → static assets → one collection per `[[apis]]` entry.
//!
//! ```text
//! <from>/config.toml ──▶ SiteConfig
//! <from>/static/**   ──▶ <output>/**                        (structure preserved)
//! [[apis]] × n       ──▶ <output>/<api_namespace>/<name>/   (select → transform → persist)
//! ```
//!
//! Collections are generated in config order. Objects inside one collection
//! are processed on the global rayon pool; the binary sizes it from
//! `[processing] max_processes` before calling [`build_site`].
//!
//! [`check_site`] runs config loading and selection only, without writing
//! anything.

use crate::config::{CollectionConfig, ConfigError, SiteConfig, Settings, load_config};
use crate::imaging::ImageBackend;
use crate::manifest::{PersistError, persist};
use crate::plugin::Plugin;
use crate::select::{SelectError, assemble};
use crate::types::{Collection, ContentObject, fields};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

/// Directory under the source root copied verbatim into the output root.
pub const STATIC_DIR: &str = "static";

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("collection `{collection}`: {source}")]
    Select {
        collection: String,
        #[source]
        source: SelectError,
    },
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("copying static files: {0}")]
    Static(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteReport {
    pub from_dir: PathBuf,
    pub output_dir: PathBuf,
    pub static_files: usize,
    pub collections: Vec<CollectionReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    pub name: String,
    pub plugin: Plugin,
    pub base_path: PathBuf,
    pub objects: Vec<ObjectSummary>,
}

/// Per-object line of a build report.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub id: u64,
    pub source: PathBuf,
    pub filename: String,
    pub url: Option<String>,
    pub has_thumbnail: bool,
}

impl ObjectSummary {
    fn of(object: &ContentObject) -> Self {
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: object.id().unwrap_or_default(),
            source: object.source().to_path_buf(),
            filename: text(fields::FILENAME).unwrap_or_else(|| {
                object
                    .source_file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            }),
            url: text(fields::URL),
            has_thumbnail: object.get(fields::THUMBNAIL).is_some(),
        }
    }
}

/// What `check` found: the sources each collection would pick up, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub from_dir: PathBuf,
    pub collections: Vec<CollectionCheck>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionCheck {
    pub name: String,
    pub plugin: Plugin,
    pub sources: Vec<PathBuf>,
}

/// Select, transform and persist one collection.
pub fn generate_collection(
    api: &CollectionConfig,
    settings: &Settings,
    backend: Arc<dyn ImageBackend>,
) -> Result<CollectionReport, SiteError> {
    info!("generating collection `{}` ({})", api.name, api.plugin);
    let objects = select_objects(api, settings)?;

    let mut collection = Collection {
        name: api.name.clone(),
        objects,
        list_attributes: api.list_attributes.clone(),
        detail_attributes: api.detail_attributes.clone(),
        base_path: settings.collection_dir(&api.name),
    };
    let chain = api.plugin.chain(settings, backend);
    debug!("{}: {:?}", api.name, chain);
    persist(&mut collection, settings, &chain, &api.args)?;

    info!(
        "collection `{}`: {} objects → {}",
        api.name,
        collection.objects.len(),
        collection.base_path.display()
    );
    Ok(CollectionReport {
        name: collection.name,
        plugin: api.plugin,
        objects: collection.objects.iter().map(ObjectSummary::of).collect(),
        base_path: collection.base_path,
    })
}

fn select_objects(
    api: &CollectionConfig,
    settings: &Settings,
) -> Result<Vec<ContentObject>, SiteError> {
    assemble(&settings.from_dir, &api.file_selectors, &api.order).map_err(|source| {
        SiteError::Select {
            collection: api.name.clone(),
            source,
        }
    })
}

/// Build the whole site from an already loaded config.
pub fn build_site(
    config: &SiteConfig,
    from_dir: &Path,
    output_dir: &Path,
    backend: Arc<dyn ImageBackend>,
) -> Result<SiteReport, SiteError> {
    config.validate()?;
    let settings = Settings::resolve(&config.settings, from_dir, output_dir)?;
    fs::create_dir_all(&settings.output_dir)?;

    let static_files = copy_static_dir(
        &settings.from_dir.join(STATIC_DIR),
        &settings.output_dir,
    )?;

    let collections = config
        .apis
        .iter()
        .map(|api| generate_collection(api, &settings, backend.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SiteReport {
        from_dir: settings.from_dir,
        output_dir: settings.output_dir,
        static_files,
        collections,
    })
}

/// Load `<from_dir>/config.toml` and build the site.
pub fn generate_site(
    from_dir: &Path,
    output_dir: &Path,
    backend: Arc<dyn ImageBackend>,
) -> Result<SiteReport, SiteError> {
    let config = load_config(from_dir)?;
    build_site(&config, from_dir, output_dir, backend)
}

/// Validate config and selectors without writing anything.
pub fn check_site(from_dir: &Path) -> Result<CheckReport, SiteError> {
    let config = load_config(from_dir)?;
    // The output dir is irrelevant for selection.
    let settings = Settings::resolve(&config.settings, from_dir, from_dir)?;

    let collections = config
        .apis
        .iter()
        .map(|api| {
            let objects = select_objects(api, &settings)?;
            Ok(CollectionCheck {
                name: api.name.clone(),
                plugin: api.plugin,
                sources: objects.iter().map(|o| o.source().to_path_buf()).collect(),
            })
        })
        .collect::<Result<Vec<_>, SiteError>>()?;
    Ok(CheckReport {
        from_dir: settings.from_dir,
        collections,
    })
}

/// Copy every file under `src` into `dest`, keeping relative paths.
///
/// A missing `src` copies nothing. Returns the number of files copied.
pub fn copy_static_dir(src: &Path, dest: &Path) -> Result<usize, SiteError> {
    if !src.is_dir() {
        debug!("no static dir at {}", src.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    debug!("copied {} static files from {}", copied, src.display());
    Ok(copied)
}
