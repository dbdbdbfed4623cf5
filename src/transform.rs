//! Per-object transform chains.
//!
//! A [`Transform`] looks at an object and returns the attributes it wants to
//! add or change. The chain runner owns the merging: transforms never mutate
//! the object they are given.
//!
//! ```text
//! object ──▶ t1(&object) ──merge──▶ t2(&object) ──merge──▶ … ──▶ persisted
//! ```
//!
//! - Transforms run strictly in chain order.
//! - Each one receives a shared borrow of the object as it stood when the
//!   call started, so it sees everything earlier transforms merged but cannot
//!   observe its own update half-applied.
//! - A transform whose optional arguments are absent returns an empty update;
//!   missing optional config is a no-op, never a failure.
//! - The first error stops the chain and names the transform that raised it.
//!
//! Post-save transforms run after the object is on disk. They see the final
//! object and exist for their side effects; whatever they return is dropped.

use crate::imaging::BackendError;
use crate::types::{Attributes, ContentObject};
use crate::urls::UrlError;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Per-collection arguments handed to every transform: the collection's
/// config table minus the keys the collection itself consumes.
pub type TransformArgs = Map<String, Value>;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("object has no output directory yet")]
    MissingObjectDir,
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named, update-producing step applied to every object of a collection.
pub trait Transform: Send + Sync {
    /// Stable name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Compute the attribute updates for `object`.
    fn apply(&self, object: &ContentObject, args: &TransformArgs)
    -> Result<Attributes, TransformError>;
}

/// A transform failure, tagged with the transform that raised it.
#[derive(Error, Debug)]
#[error("transform `{transform}` failed: {source}")]
pub struct ChainError {
    pub transform: &'static str,
    #[source]
    pub source: TransformError,
}

/// Ordered pre-save and post-save transforms for one use case.
#[derive(Default)]
pub struct TransformChain {
    pre_save: Vec<Box<dyn Transform>>,
    post_save: Vec<Box<dyn Transform>>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pre_save(mut self, transform: impl Transform + 'static) -> Self {
        self.pre_save.push(Box::new(transform));
        self
    }

    pub fn with_post_save(mut self, transform: impl Transform + 'static) -> Self {
        self.post_save.push(Box::new(transform));
        self
    }

    pub fn pre_save_names(&self) -> Vec<&'static str> {
        self.pre_save.iter().map(|t| t.name()).collect()
    }

    pub fn post_save_names(&self) -> Vec<&'static str> {
        self.post_save.iter().map(|t| t.name()).collect()
    }

    /// Run the pre-save transforms in order, merging each update into `object`.
    pub fn run_pre_save(
        &self,
        object: &mut ContentObject,
        args: &TransformArgs,
    ) -> Result<(), ChainError> {
        for transform in &self.pre_save {
            let updates = transform
                .apply(object, args)
                .map_err(|source| ChainError {
                    transform: transform.name(),
                    source,
                })?;
            object.merge(updates);
        }
        Ok(())
    }

    /// Run the post-save transforms in order. Their updates are discarded.
    pub fn run_post_save(
        &self,
        object: &ContentObject,
        args: &TransformArgs,
    ) -> Result<(), ChainError> {
        for transform in &self.post_save {
            transform
                .apply(object, args)
                .map_err(|source| ChainError {
                    transform: transform.name(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformChain")
            .field("pre_save", &self.pre_save_names())
            .field("post_save", &self.post_save_names())
            .finish()
    }
}
