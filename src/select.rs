//! Object selection and ordering.
//!
//! Turns a collection's `file_selectors` into the ordered sequence of
//! [`ContentObject`]s the rest of the pipeline works on.
//!
//! ## Selection
//!
//! Each selector is a glob pattern relative to the source root (`*`, `**`,
//! `?`, `[...]`). Selectors are expanded in list order and their matches
//! concatenated. Within one selector, matches come back in the `glob` crate's
//! order (entries sorted by name within each directory). Overlapping selectors
//! are **not** deduplicated: a file matched by two selectors becomes two
//! objects. Directories that happen to match are skipped. A selector that
//! matches nothing contributes nothing; that is not an error.
//!
//! ## Ordering
//!
//! With a `sort_key`, the whole sequence is stable-sorted by that field,
//! ascending or (with `reverse`) descending. Ties keep selection order in both
//! directions. Every object must carry the key, and all values must be of one
//! kind (numbers, strings, or booleans); anything else fails the collection
//! rather than guessing an order. Without a `sort_key`, selection order stands.

use crate::config::OrderConfig;
use crate::metadata::{self, MetadataError};
use crate::types::ContentObject;
use glob::{MatchOptions, Pattern};
use log::debug;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("invalid selector `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("cannot read match for selector `{pattern}`: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::GlobError,
    },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("{} has no `{key}` field to sort by", path.display())]
    MissingSortKey { key: String, path: PathBuf },
    #[error("cannot sort by `{key}`: {} has a {found} value, expected {expected}", path.display())]
    IncomparableSortKey {
        key: String,
        path: PathBuf,
        found: &'static str,
        expected: &'static str,
    },
}

/// Hidden files only match when the selector spells out the leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// Check a selector on its own, so error positions refer to what the user wrote.
pub fn validate_selector(selector: &str) -> Result<(), SelectError> {
    Pattern::new(selector)
        .map(|_| ())
        .map_err(|source| SelectError::Pattern {
            pattern: selector.to_string(),
            source,
        })
}

/// Expand `selectors` against `root`, in selector order, files only.
///
/// Dotfiles are skipped unless the selector names them (`.*`), so editor
/// leftovers and interrupted rewrites never become objects.
pub fn expand_selectors(root: &Path, selectors: &[String]) -> Result<Vec<PathBuf>, SelectError> {
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let mut paths = Vec::new();

    for selector in selectors {
        validate_selector(selector)?;
        let pattern = if Path::new(selector).is_absolute() {
            selector.clone()
        } else {
            format!("{}/{}", escaped_root.trim_end_matches('/'), selector)
        };
        let matches =
            glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|source| SelectError::Pattern {
                pattern: selector.clone(),
                source,
            })?;

        let before = paths.len();
        for entry in matches {
            let path = entry.map_err(|source| SelectError::Glob {
                pattern: selector.clone(),
                source,
            })?;
            if path.is_file() {
                paths.push(path);
            }
        }
        debug!("selector `{}` matched {} files", selector, paths.len() - before);
    }

    let mut seen = HashSet::new();
    for path in &paths {
        if !seen.insert(path) {
            debug!("{} selected more than once", path.display());
        }
    }

    Ok(paths)
}

/// Select, enrich and order the objects for one collection.
pub fn assemble(
    root: &Path,
    selectors: &[String],
    order: &OrderConfig,
) -> Result<Vec<ContentObject>, SelectError> {
    let mut objects = expand_selectors(root, selectors)?
        .iter()
        .map(|path| metadata::build_object(path))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(key) = &order.sort_key {
        sort_objects(&mut objects, key, order.reverse)?;
    }
    Ok(objects)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKind {
    Number,
    String,
    Bool,
}

impl SortKind {
    fn of(value: &Value) -> Result<Self, &'static str> {
        match value {
            Value::Number(_) => Ok(Self::Number),
            Value::String(_) => Ok(Self::String),
            Value::Bool(_) => Ok(Self::Bool),
            Value::Null => Err("null"),
            Value::Array(_) => Err("list"),
            Value::Object(_) => Err("mapping"),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Bool => "boolean",
        }
    }
}

/// Stable-sort `objects` by the `key` field.
pub fn sort_objects(
    objects: &mut [ContentObject],
    key: &str,
    reverse: bool,
) -> Result<(), SelectError> {
    let mut expected: Option<SortKind> = None;
    for object in objects.iter() {
        let value = object.get(key).ok_or_else(|| SelectError::MissingSortKey {
            key: key.to_string(),
            path: object.source().to_path_buf(),
        })?;
        let incomparable = |found: &'static str, expected: &'static str| {
            SelectError::IncomparableSortKey {
                key: key.to_string(),
                path: object.source().to_path_buf(),
                found,
                expected,
            }
        };
        let kind = SortKind::of(value)
            .map_err(|found| incomparable(found, "a number, string or boolean"))?;
        match expected {
            None => expected = Some(kind),
            Some(k) if k != kind => return Err(incomparable(kind.describe(), k.describe())),
            Some(_) => {}
        }
    }

    objects.sort_by(|a, b| {
        // Presence and kind were checked above.
        let ordering = match (a.get(key), b.get(key)) {
            (Some(x), Some(y)) => compare_values(x, y),
            _ => Ordering::Equal,
        };
        if reverse { ordering.reverse() } else { ordering }
    });
    Ok(())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
