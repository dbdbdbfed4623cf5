//! Static plugin registry.
//!
//! A plugin names a use case: which arguments a collection accepts and which
//! transform chain its objects go through. The set is closed and resolved
//! when the config is parsed, so an unknown `plugin = "..."` is a config
//! error rather than a runtime lookup failure.
//!
//! | Plugin | Arguments | Pre-save | Post-save |
//! |---|---|---|---|
//! | `collection` | none | none | none |
//! | `gallery` | optional `thumbnail` | `set_attributes`, `normalize_orientation`, `generate_thumbnail` | none |

use crate::config::Settings;
use crate::gallery::{GalleryArgs, gallery_chain};
use crate::imaging::ImageBackend;
use crate::transform::{TransformArgs, TransformChain};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plugin {
    /// Objects with their filesystem and sidecar attributes, nothing more.
    Collection,
    /// Images: URL, upright orientation, optional thumbnail.
    Gallery,
}

impl Plugin {
    pub fn name(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Gallery => "gallery",
        }
    }

    /// Check the plugin argument table of a collection.
    pub fn validate_args(self, args: &TransformArgs) -> Result<(), String> {
        match self {
            Self::Collection if args.is_empty() => Ok(()),
            Self::Collection => {
                let keys: Vec<&str> = args.keys().map(String::as_str).collect();
                Err(format!(
                    "plugin `collection` takes no arguments, got {}",
                    keys.join(", ")
                ))
            }
            Self::Gallery => GalleryArgs::from_args(args).map(|_| ()),
        }
    }

    /// Build the transform chain for this plugin.
    pub fn chain(self, settings: &Settings, backend: Arc<dyn ImageBackend>) -> TransformChain {
        match self {
            Self::Collection => TransformChain::new(),
            Self::Gallery => gallery_chain(&settings.urls(), backend),
        }
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
