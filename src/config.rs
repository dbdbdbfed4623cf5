//! Site configuration.
//!
//! Loads and validates `config.toml` from the source root. The file has
//! three parts: global `[settings]`, `[processing]` limits, and one
//! `[[apis]]` table per generated collection.
//!
//! ```toml
//! [settings]
//! api_namespace = "api"               # Path segment under the output dir
//! base_url = "https://example.com/"   # Optional; URLs are relative without it
//!
//! [processing]
//! max_processes = 4                   # Max parallel workers (omit for auto = CPU cores)
//!
//! [[apis]]
//! plugin = "gallery"                  # "gallery" or "collection"
//! name = "photos"                     # Collection path segment
//! file_selectors = ["photos/*.jpg"]   # Globs relative to the source root
//! list_attributes = ["id", "url", "thumbnail"]
//! detail_attributes = ["id", "image", "filename", "title"]
//! order = { sort_key = "filename", reverse = false }
//!
//! [apis.thumbnail]                    # Plugin argument, see `gallery`
//! size = 200
//! ```
//!
//! User values are merged over stock defaults, so only `[[apis]]` is really
//! required. Unknown keys are rejected to catch typos early, with one
//! exception: keys in an `[[apis]]` table that the collection itself does not
//! define are plugin arguments, and the plugin named by `plugin` validates
//! them.
//!
//! The output and source directories are not part of the file; the caller
//! supplies them and [`Settings::resolve`] pins them down as absolute paths.

use crate::plugin::Plugin;
use crate::select::validate_selector;
use crate::transform::TransformArgs;
use crate::urls::UrlResolver;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Name of the config file in the source root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no {CONFIG_FILENAME} in {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Output layout and URL settings.
    pub settings: SettingsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Collections to generate, in order.
    pub apis: Vec<CollectionConfig>,
}

/// Global `[settings]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    /// Path segment under the output dir that holds every collection.
    pub api_namespace: String,
    /// Absolute URL prefix for generated URLs.
    pub base_url: Option<String>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            api_namespace: "api".to_string(),
            base_url: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel per-object workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// One `[[apis]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Which registered plugin generates this collection.
    pub plugin: Plugin,
    /// Collection path segment.
    pub name: String,
    /// Glob patterns relative to the source root, expanded in order.
    pub file_selectors: Vec<String>,
    /// Attributes kept in the aggregate `index.json`.
    pub list_attributes: Vec<String>,
    /// Attributes kept in each per-object `index.json`.
    pub detail_attributes: Vec<String>,
    #[serde(default)]
    pub order: OrderConfig,
    /// Everything else in the table: arguments for the plugin's transforms.
    #[serde(flatten)]
    pub args: TransformArgs,
}

/// Ordering for a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderConfig {
    /// Field to sort by. Selection order is kept when absent.
    pub sort_key: Option<String>,
    /// Sort descending.
    pub reverse: bool,
}

impl SiteConfig {
    /// Validate config values before anything is written.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_segment("settings.api_namespace", &self.settings.api_namespace)?;
        if let Some(base) = &self.settings.base_url {
            parse_base_url(base)?;
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }

        let mut names = HashSet::new();
        for api in &self.apis {
            validate_segment("apis.name", &api.name)?;
            if !names.insert(api.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate collection name `{}`",
                    api.name
                )));
            }
            if api.file_selectors.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "collection `{}`: file_selectors must not be empty",
                    api.name
                )));
            }
            for selector in &api.file_selectors {
                validate_selector(selector).map_err(|e| {
                    ConfigError::Validation(format!("collection `{}`: {}", api.name, e))
                })?;
            }
            api.plugin.validate_args(&api.args).map_err(|e| {
                ConfigError::Validation(format!("collection `{}`: {}", api.name, e))
            })?;
        }
        Ok(())
    }
}

/// A single, non-empty path segment that stays inside its parent.
///
/// `:` is refused too: `a:b/1` joined onto a base URL parses as a URL with
/// scheme `a`.
fn validate_segment(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', ':'])
    {
        return Err(ConfigError::Validation(format!(
            "{field} must be a single path segment, got `{value}`"
        )));
    }
    Ok(())
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| {
        ConfigError::Validation(format!("settings.base_url `{value}` is not a URL: {e}"))
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Validation(format!(
            "settings.base_url `{value}` cannot be used as a base URL"
        )));
    }
    Ok(url)
}

// =============================================================================
// Resolved settings
// =============================================================================

/// Settings every pipeline component receives, resolved once per run.
///
/// Immutable: built from the config plus caller-supplied directories and
/// passed by reference into each entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub from_dir: PathBuf,
    pub output_dir: PathBuf,
    pub api_namespace: String,
    pub base_url: Option<Url>,
}

impl Settings {
    /// Combine `[settings]` with the source and output directories, made absolute.
    pub fn resolve(
        config: &SettingsConfig,
        from_dir: &Path,
        output_dir: &Path,
    ) -> Result<Self, ConfigError> {
        validate_segment("settings.api_namespace", &config.api_namespace)?;
        let base_url = config.base_url.as_deref().map(parse_base_url).transpose()?;
        Ok(Self {
            from_dir: absolute_normalized(from_dir)?,
            output_dir: absolute_normalized(output_dir)?,
            api_namespace: config.api_namespace.clone(),
            base_url,
        })
    }

    /// `output_dir/api_namespace/name`.
    pub fn collection_dir(&self, name: &str) -> PathBuf {
        self.output_dir.join(&self.api_namespace).join(name)
    }

    pub fn urls(&self) -> UrlResolver {
        UrlResolver::new(&self.output_dir, self.base_url.clone())
    }
}

/// Make `path` absolute and fold `.` and `..` lexically, without touching
/// the filesystem: `/cwd/../site` becomes `/site`.
fn absolute_normalized(path: &Path) -> std::io::Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

// =============================================================================
// Config loading and merging
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user values are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value(), overlay);
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from the source root.
///
/// Unlike optional per-directory overrides, the root file is required: it
/// is the only place collections are declared.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.is_file() {
        return Err(ConfigError::NotFound(root.to_path_buf()));
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mypoint configuration
# =====================
# Place this file in the source directory as config.toml.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Output layout
# ---------------------------------------------------------------------------
[settings]
# Path segment under the output directory holding every collection:
#   <output>/<api_namespace>/<collection>/<id>/index.json
api_namespace = "api"

# Absolute URL prefix for generated URLs. Without it, URLs are paths
# relative to the output directory.
# base_url = "https://example.com/"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Collections: one [[apis]] table each
# ---------------------------------------------------------------------------
[[apis]]
# "gallery": image URLs, EXIF orientation fix, optional thumbnails.
# "collection": plain objects, no transforms.
plugin = "gallery"

# Collection path segment.
name = "photos"

# Glob patterns relative to the source directory, expanded in order.
# Overlapping patterns are not deduplicated.
file_selectors = ["photos/*.jpg"]

# Attributes in <collection>/index.json and in each <id>/index.json.
list_attributes = ["id", "url", "thumbnail"]
detail_attributes = ["id", "filename", "image", "thumbnail"]

# Sort by any object field, including sidecar (<file>.yaml) fields.
# Omit sort_key to keep selection order.
order = { sort_key = "filename", reverse = false }

# Gallery only. Omit the table to skip thumbnails.
[apis.thumbnail]
# N (fit in NxN), "WxH", "Wx" (width only) or "xH" (height only).
size = 200
# Fill the box and center-crop instead of fitting inside it.
crop = false
# JPEG quality (1-100).
quality = 90
# Light unsharp mask after resizing.
sharpen = false
"##
}
