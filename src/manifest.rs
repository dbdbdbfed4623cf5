//! Manifest writer: places objects in the output tree and writes the JSON
//! documents describing them.
//!
//! ## Output Structure
//!
//! ```text
//! <output>/<api_namespace>/<collection>/
//! ├── index.json          # aggregate: every object reduced to list_attributes
//! ├── 1/
//! │   ├── index.json      # detail: object reduced to detail_attributes
//! │   ├── dawn.jpg        # copied source asset, mtime preserved
//! │   └── thumbnail.jpg   # written by transforms, if any
//! └── 2/
//!     └── ...
//! ```
//!
//! ## Phases
//!
//! 1. **Placement** (sequential): ids `1..=n` follow the collection order;
//!    `id`, `obj_dir`, `url` and `obj_detail_json_path` are set on every
//!    object before any work starts, so ids never depend on completion order.
//! 2. **Per-object work** (parallel, rayon): create the directory, run the
//!    pre-save chain, write the detail document, copy the asset, run the
//!    post-save chain. Each object owns its directory. Objects built from the
//!    same source file (overlapping selectors) are serialized on that file,
//!    since pre-save transforms may rewrite it.
//! 3. **Aggregate** (after the join): write the collection `index.json`.
//!
//! The first failure aborts the collection and the aggregate document is not
//! written, so it never references an object that failed to persist. Objects
//! already written stay on disk.

use crate::config::Settings;
use crate::transform::{TransformArgs, TransformChain};
use crate::types::{Attributes, Collection, ContentObject, INDEX_FILENAME, fields};
use log::debug;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Where in the per-object sequence a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveUrl,
    CreateDir,
    PreSave(&'static str),
    WriteDetail,
    CopyAsset,
    PostSave(&'static str),
    WriteIndex,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveUrl => f.write_str("resolving URL"),
            Self::CreateDir => f.write_str("creating directory"),
            Self::PreSave(name) => write!(f, "pre-save transform `{name}`"),
            Self::WriteDetail => f.write_str("writing detail document"),
            Self::CopyAsset => f.write_str("copying asset"),
            Self::PostSave(name) => write!(f, "post-save transform `{name}`"),
            Self::WriteIndex => f.write_str("writing aggregate index"),
        }
    }
}

/// A persist failure, naming the collection, object and step.
///
/// `id` is `None` for the aggregate index, whose `path` is the index file.
#[derive(Error, Debug)]
#[error("collection `{collection}`: {step} failed for {}: {source}", describe(.id, .path))]
pub struct PersistError {
    pub collection: String,
    pub id: Option<u64>,
    pub path: PathBuf,
    pub step: Step,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

fn describe(id: &Option<u64>, path: &Path) -> String {
    match id {
        Some(id) => format!("object {id} ({})", path.display()),
        None => path.display().to_string(),
    }
}

impl PersistError {
    fn new(
        collection: &Collection,
        object: &ContentObject,
        step: Step,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            collection: collection.name.clone(),
            id: object.id(),
            path: object.source().to_path_buf(),
            step,
            source: source.into(),
        }
    }
}

/// Per-source locks for objects that share a source file.
struct SourceLocks(HashMap<PathBuf, Mutex<()>>);

impl SourceLocks {
    fn for_objects(objects: &[ContentObject]) -> Self {
        Self(
            objects
                .iter()
                .map(|o| (o.source().to_path_buf(), Mutex::new(())))
                .collect(),
        )
    }

    fn lock(&self, source: &Path) -> Option<std::sync::MutexGuard<'_, ()>> {
        // A poisoned lock only means another worker panicked; the guard is still usable.
        self.0
            .get(source)
            .map(|m| m.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Persist `collection`: per-object directories and documents, then the
/// aggregate index.
pub fn persist(
    collection: &mut Collection,
    settings: &Settings,
    chain: &TransformChain,
    args: &TransformArgs,
) -> Result<(), PersistError> {
    place_objects(collection, settings)?;

    let locks = SourceLocks::for_objects(&collection.objects);
    let mut objects = std::mem::take(&mut collection.objects);
    let result = objects.par_iter_mut().try_for_each(|object| {
        let _guard = locks.lock(object.source());
        persist_object(collection, object, chain, args)
    });
    collection.objects = objects;
    result?;

    write_index(collection)
}

/// Assign ids and the derived location fields, in collection order.
fn place_objects(collection: &mut Collection, settings: &Settings) -> Result<(), PersistError> {
    let urls = settings.urls();
    for (index, object) in collection.objects.iter_mut().enumerate() {
        let id = index as u64 + 1;
        let dir = collection.base_path.join(id.to_string());
        let url = urls.resolve(&dir).map_err(|e| PersistError {
            collection: collection.name.clone(),
            id: Some(id),
            path: object.source().to_path_buf(),
            step: Step::ResolveUrl,
            source: Box::new(e),
        })?;

        object.insert(fields::ID, id);
        object.insert(fields::OBJECT_DIR, dir.to_string_lossy().into_owned());
        object.insert(fields::URL, url);
        object.insert(
            fields::DETAIL_JSON_PATH,
            dir.join(INDEX_FILENAME).to_string_lossy().into_owned(),
        );
        object.set_placement(id, dir);
    }
    Ok(())
}

fn persist_object(
    collection: &Collection,
    object: &mut ContentObject,
    chain: &TransformChain,
    args: &TransformArgs,
) -> Result<(), PersistError> {
    let dir = object.object_dir().map(Path::to_path_buf).ok_or_else(|| {
        PersistError::new(collection, object, Step::CreateDir, "object was never placed")
    })?;

    if dir.is_dir() {
        debug!("reusing {}", dir.display());
    }
    fs::create_dir_all(&dir)
        .map_err(|e| PersistError::new(collection, object, Step::CreateDir, e))?;

    chain.run_pre_save(object, args).map_err(|e| {
        PersistError::new(collection, object, Step::PreSave(e.transform), e.source)
    })?;

    let detail = Value::Object(object.select(&collection.detail_attributes));
    let detail_path = dir.join(INDEX_FILENAME);
    write_json(&detail_path, &detail)
        .map_err(|e| PersistError::new(collection, object, Step::WriteDetail, e))?;
    debug!("wrote {}", detail_path.display());

    if let Some(name) = object.source_file_name() {
        let target = dir.join(name);
        copy_preserving_metadata(object.source(), &target)
            .map_err(|e| PersistError::new(collection, object, Step::CopyAsset, e))?;
        debug!("copied {} → {}", object.source().display(), target.display());
    }

    chain.run_post_save(object, args).map_err(|e| {
        PersistError::new(collection, object, Step::PostSave(e.transform), e.source)
    })
}

fn write_index(collection: &Collection) -> Result<(), PersistError> {
    let entries: Vec<Attributes> = collection
        .objects
        .iter()
        .map(|o| o.select(&collection.list_attributes))
        .collect();
    let path = collection.index_path();

    let result = fs::create_dir_all(&collection.base_path)
        .map_err(Box::<dyn StdError + Send + Sync>::from)
        .and_then(|()| write_json(&path, &entries));
    result.map_err(|source| PersistError {
        collection: collection.name.clone(),
        id: None,
        path: path.clone(),
        step: Step::WriteIndex,
        source,
    })?;
    debug!("wrote {}", path.display());
    Ok(())
}

fn write_json(
    path: &Path,
    value: &impl serde::Serialize,
) -> Result<(), Box<dyn StdError + Send + Sync>> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Copy `from` to `to`, keeping permissions and access/modification times.
fn copy_preserving_metadata(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::copy(from, to)?;
    let meta = fs::metadata(from)?;
    filetime::set_file_times(
        to,
        filetime::FileTime::from_last_access_time(&meta),
        filetime::FileTime::from_last_modification_time(&meta),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{read_json, write_bytes};
    use crate::transform::tests::{Recorder, SetField};
    use crate::transform::{Transform, TransformError};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        src: PathBuf,
        settings: Settings,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        let settings = Settings {
            from_dir: src.clone(),
            output_dir: out,
            api_namespace: "api".into(),
            base_url: None,
        };
        Fixture {
            _tmp: tmp,
            src,
            settings,
        }
    }

    fn collection(fx: &Fixture, names: &[&str]) -> Collection {
        let objects = names
            .iter()
            .map(|name| {
                let path = fx.src.join(name);
                if !path.exists() {
                    write_bytes(&path, name.as_bytes());
                }
                let mut obj = ContentObject::new(&path);
                obj.insert(fields::FILENAME, *name);
                obj.insert("title", format!("title of {name}"));
                obj
            })
            .collect();
        Collection {
            name: "photos".into(),
            objects,
            list_attributes: vec!["id".into(), "url".into(), "missing".into()],
            detail_attributes: vec!["id".into(), "filename".into(), "title".into()],
            base_path: fx.settings.collection_dir("photos"),
        }
    }

    fn base(fx: &Fixture) -> PathBuf {
        fx.settings.collection_dir("photos")
    }

    #[test]
    fn writes_layout_and_documents() {
        let fx = fixture();
        let mut coll = collection(&fx, &["a.jpg", "b.jpg"]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();

        let index = read_json(&base(&fx).join("index.json"));
        assert_eq!(
            index,
            json!([
                {"id": 1, "url": "api/photos/1"},
                {"id": 2, "url": "api/photos/2"},
            ])
        );

        let detail = read_json(&base(&fx).join("2/index.json"));
        assert_eq!(
            detail,
            json!({"filename": "b.jpg", "title": "title of b.jpg", "id": 2})
        );
        assert_eq!(fs::read(base(&fx).join("1/a.jpg")).unwrap(), b"a.jpg");
    }

    #[test]
    fn placement_fields_set_on_objects() {
        let fx = fixture();
        let mut coll = collection(&fx, &["a.jpg"]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();

        let obj = &coll.objects[0];
        let dir = base(&fx).join("1");
        assert_eq!(obj.id(), Some(1));
        assert_eq!(obj.object_dir(), Some(dir.as_path()));
        assert_eq!(obj.get("obj_dir"), Some(&json!(dir.to_string_lossy())));
        assert_eq!(
            obj.get("obj_detail_json_path"),
            Some(&json!(dir.join("index.json").to_string_lossy()))
        );
    }

    #[test]
    fn base_url_is_joined() {
        let mut fx = fixture();
        fx.settings.base_url = Some(url::Url::parse("https://example.com/site/").unwrap());
        let mut coll = collection(&fx, &["a.jpg"]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();
        assert_eq!(
            coll.objects[0].get("url"),
            Some(&json!("https://example.com/site/api/photos/1"))
        );
    }

    #[test]
    fn ids_are_contiguous_in_collection_order() {
        let fx = fixture();
        let names: Vec<String> = (0..25).map(|i| format!("{i:02}.jpg")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut coll = collection(&fx, &refs);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();

        let index = read_json(&base(&fx).join("index.json"));
        let ids: Vec<u64> = index
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, (1..=25).collect::<Vec<_>>());
        for (i, obj) in coll.objects.iter().enumerate() {
            assert_eq!(obj.get("filename"), Some(&json!(names[i])));
        }
    }

    #[test]
    fn empty_collection_writes_empty_index() {
        let fx = fixture();
        let mut coll = collection(&fx, &[]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();
        assert_eq!(read_json(&base(&fx).join("index.json")), json!([]));
    }

    #[test]
    fn existing_directories_are_reused() {
        let fx = fixture();
        fs::create_dir_all(base(&fx).join("1")).unwrap();
        let mut coll = collection(&fx, &["a.jpg"]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();
        assert!(base(&fx).join("1/index.json").exists());
    }

    #[test]
    fn pre_save_updates_reach_documents() {
        let fx = fixture();
        let mut coll = collection(&fx, &["a.jpg"]);
        coll.detail_attributes.push("image".into());
        let chain = TransformChain::new().with_pre_save(SetField("image", json!("img.jpg")));
        persist(&mut coll, &fx.settings, &chain, &TransformArgs::new()).unwrap();

        let detail = read_json(&base(&fx).join("1/index.json"));
        assert_eq!(detail["image"], json!("img.jpg"));
    }

    #[test]
    fn post_save_sees_persisted_object() {
        let fx = fixture();
        let recorder = Arc::new(Recorder::default());
        let chain = TransformChain::new().with_post_save(recorder.clone());
        let mut coll = collection(&fx, &["a.jpg", "b.jpg"]);
        persist(&mut coll, &fx.settings, &chain, &TransformArgs::new()).unwrap();

        let mut seen = recorder.0.lock().unwrap().clone();
        seen.sort_by_key(|v| v.as_ref().and_then(Value::as_u64));
        assert_eq!(seen, vec![Some(json!(1)), Some(json!(2))]);
        assert!(coll.objects.iter().all(|o| o.get("ignored").is_none()));
    }

    #[test]
    fn copy_preserves_mtime() {
        let fx = fixture();
        let src = fx.src.join("old.jpg");
        write_bytes(&src, b"x");
        let past = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&src, past).unwrap();

        let mut coll = collection(&fx, &["old.jpg"]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();

        let copied = fs::metadata(base(&fx).join("1/old.jpg")).unwrap();
        assert_eq!(filetime::FileTime::from_last_modification_time(&copied), past);
    }

    #[test]
    fn duplicate_sources_get_distinct_objects() {
        let fx = fixture();
        let mut coll = collection(&fx, &["a.jpg", "a.jpg"]);
        persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new()).unwrap();
        assert!(base(&fx).join("1/a.jpg").exists());
        assert!(base(&fx).join("2/a.jpg").exists());
    }

    // =========================================================================
    // Failures
    // =========================================================================

    /// Fails for one specific filename.
    struct FailOn(&'static str);

    impl Transform for FailOn {
        fn name(&self) -> &'static str {
            "fail_on"
        }

        fn apply(&self, obj: &ContentObject, _: &TransformArgs) -> Result<Attributes, TransformError> {
            if obj.get("filename") == Some(&json!(self.0)) {
                return Err(TransformError::InvalidArgs("boom".into()));
            }
            Ok(Attributes::new())
        }
    }

    #[test]
    fn transform_failure_aborts_without_index() {
        let fx = fixture();
        let chain = TransformChain::new().with_pre_save(FailOn("b.jpg"));
        let mut coll = collection(&fx, &["a.jpg", "b.jpg", "c.jpg"]);
        let err = persist(&mut coll, &fx.settings, &chain, &TransformArgs::new()).unwrap_err();

        assert_eq!(err.step, Step::PreSave("fail_on"));
        assert_eq!(err.id, Some(2));
        assert_eq!(err.collection, "photos");
        assert!(err.path.ends_with("b.jpg"));
        assert!(!base(&fx).join("index.json").exists());
        assert_eq!(coll.objects.len(), 3, "objects are handed back on failure");

        let message = err.to_string();
        assert!(message.contains("object 2"), "{message}");
        assert!(message.contains("fail_on"), "{message}");
    }

    #[test]
    fn missing_source_fails_at_copy() {
        let fx = fixture();
        let mut coll = collection(&fx, &["a.jpg"]);
        fs::remove_file(fx.src.join("a.jpg")).unwrap();
        let err = persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new())
            .unwrap_err();
        assert_eq!(err.step, Step::CopyAsset);
        assert!(!base(&fx).join("index.json").exists());
    }

    #[test]
    fn blocked_directory_fails_at_create() {
        let fx = fixture();
        // A file where the object directory should go.
        write_bytes(&base(&fx).join("1"), b"");
        let mut coll = collection(&fx, &["a.jpg"]);
        let err = persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new())
            .unwrap_err();
        assert_eq!(err.step, Step::CreateDir);
    }

    #[test]
    fn url_outside_output_fails_at_placement() {
        let fx = fixture();
        let mut coll = collection(&fx, &["a.jpg"]);
        coll.base_path = PathBuf::from("/elsewhere/photos");
        let err = persist(&mut coll, &fx.settings, &TransformChain::new(), &TransformArgs::new())
            .unwrap_err();
        assert_eq!(err.step, Step::ResolveUrl);
        assert_eq!(err.id, Some(1));
    }

    #[test]
    fn step_display() {
        assert_eq!(Step::PreSave("x").to_string(), "pre-save transform `x`");
        assert_eq!(Step::WriteIndex.to_string(), "writing aggregate index");
    }
}
