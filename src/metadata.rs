//! Per-file metadata: filesystem fields and sidecar overrides.
//!
//! Every object starts from four filesystem-derived fields:
//!
//! | Field | Source |
//! |---|---|
//! | `path` | absolute source path |
//! | `filename` | base name of `path` |
//! | `mtime` | modification time, seconds since the Unix epoch |
//! | `ctime` | creation time where the platform reports one, else `mtime` |
//!
//! ## Sidecar documents
//!
//! A YAML file next to the source, named `<file><SIDECAR_SUFFIX>`
//! (`dawn.jpg` → `dawn.jpg.yaml`), is merged over the base fields. Sidecar
//! keys always win, including the computed ones: a sidecar `mtime` replaces
//! the filesystem one.
//!
//! A missing sidecar is an empty override. An empty file is too. A sidecar
//! that exists but cannot be parsed, or whose top level is not a mapping, is
//! an error: dropping custom data silently would hand downstream consumers
//! objects without fields they were promised.

use crate::types::{Attributes, ContentObject, fields};
use serde_json::Value;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Suffix appended to a source file's full name to locate its sidecar.
pub const SIDECAR_SUFFIX: &str = ".yaml";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed sidecar {}: {source}", path.display())]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("sidecar {} must contain a mapping at the top level", path.display())]
    SidecarNotMapping { path: PathBuf },
    #[error("sidecar {} has values with no JSON equivalent: {source}", path.display())]
    SidecarValue {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Sidecar location for `path`: the full file name plus [`SIDECAR_SUFFIX`].
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Load the sidecar for `path`, or an empty map if there is none.
pub fn read_sidecar(path: &Path) -> Result<Attributes, MetadataError> {
    let sidecar = sidecar_path(path);
    if !sidecar.is_file() {
        return Ok(Attributes::new());
    }
    let content = std::fs::read_to_string(&sidecar).map_err(|source| MetadataError::Io {
        path: sidecar.clone(),
        source,
    })?;
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|source| MetadataError::Sidecar {
            path: sidecar.clone(),
            source,
        })?;
    if yaml.is_null() {
        return Ok(Attributes::new());
    }
    if !yaml.is_mapping() {
        return Err(MetadataError::SidecarNotMapping { path: sidecar });
    }
    match serde_json::to_value(yaml) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(MetadataError::SidecarNotMapping { path: sidecar }),
        Err(source) => Err(MetadataError::SidecarValue {
            path: sidecar,
            source,
        }),
    }
}

/// Filesystem-derived fields for `path`.
pub fn base_fields(path: &Path) -> Result<Attributes, MetadataError> {
    let meta = std::fs::metadata(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = meta.modified().map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let created = meta.created().unwrap_or(modified);

    let mut attrs = Attributes::new();
    attrs.insert(
        fields::PATH.into(),
        Value::String(path.to_string_lossy().into_owned()),
    );
    attrs.insert(
        fields::FILENAME.into(),
        Value::String(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
    );
    attrs.insert(fields::MTIME.into(), epoch_seconds(modified));
    attrs.insert(fields::CTIME.into(), epoch_seconds(created));
    Ok(attrs)
}

/// Build the object for one matched file: base fields, then sidecar overrides.
pub fn build_object(path: &Path) -> Result<ContentObject, MetadataError> {
    let mut object = ContentObject::new(path);
    object.merge(base_fields(path)?);
    object.merge(read_sidecar(path)?);
    Ok(object)
}

/// Seconds since the Unix epoch as a JSON number. Pre-epoch times go negative.
fn epoch_seconds(time: SystemTime) -> Value {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    };
    serde_json::Number::from_f64(secs)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
