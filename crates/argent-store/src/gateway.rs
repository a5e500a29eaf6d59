//! # Persistence Gateway
//!
//! Path-addressed access to the JSON tree holding all branch data.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        JSON Tree Store                                  │
//! │                                                                         │
//! │  Engine Startup                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(path) ← File-backed, or in_memory() for tests        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  JsonStore::open(config).await ← Load tree (or start empty)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │   Mutex<Value>  (the whole tree)        │                           │
//! │  │                                         │                           │
//! │  │   read("branchData/b1")     → clone     │                           │
//! │  │   write("branchData/b1", v) → merge     │                           │
//! │  │   write_at_root(tree)       → replace   │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼ every successful write                                          │
//! │  temp file + rename (atomic on POSIX)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Semantics
//! `write` deep-merges objects key by key and replaces everything else
//! (scalars, arrays) wholesale, so a branch patch like
//! `{ products: [...], sales: [...] }` updates two collections in one
//! logical write without touching the others.
//!
//! ## Revision CAS
//! A patch whose top level carries a numeric `revision` is compared against
//! the stored one at the same path: not strictly newer means another writer
//! committed first and the write fails with [`StoreError::StaleWrite`].
//! Patches without a revision (metadata, provisioning) skip the check.

use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::path;

// =============================================================================
// Gateway Trait
// =============================================================================

/// Path-addressed JSON tree access.
///
/// The engine is generic over this trait so tests can interpose failing or
/// observing doubles around [`JsonStore`].
#[allow(async_fn_in_trait)]
pub trait PersistenceGateway {
    /// Reads the value at `tree_path` (`""` for the whole tree).
    async fn read(&self, tree_path: &str) -> StoreResult<Option<Value>>;

    /// Deep-merges `value` into the subtree at `tree_path`.
    async fn write(&self, tree_path: &str, value: Value) -> StoreResult<()>;

    /// Replaces the entire tree. Used by restore and provisioning flows.
    async fn write_at_root(&self, tree: Value) -> StoreResult<()>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("./data/ledger.json").pretty(false);
/// let store = JsonStore::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backing file. `None` keeps the tree purely in memory (for tests).
    pub file_path: Option<PathBuf>,

    /// Pretty-print the file. Default: true (the tree is small and humans
    /// read it during support sessions).
    pub pretty: bool,
}

impl StoreConfig {
    /// Creates a file-backed configuration. The file is created on the first
    /// write if it doesn't exist.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            file_path: Some(file_path.into()),
            pretty: true,
        }
    }

    /// Creates an in-memory configuration (for testing).
    pub fn in_memory() -> Self {
        StoreConfig {
            file_path: None,
            pretty: false,
        }
    }

    /// Sets pretty-printing of the backing file.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

// =============================================================================
// JSON Store
// =============================================================================

/// The JSON tree store.
///
/// Holds the whole tree behind a mutex; every write commits to memory only
/// after the backing file (if any) was replaced atomically, so memory never
/// claims more than the disk holds.
#[derive(Debug)]
pub struct JsonStore {
    config: StoreConfig,
    tree: Mutex<Value>,
}

impl JsonStore {
    /// Opens the store, loading the backing file when present.
    ///
    /// ## Returns
    /// * `Ok(JsonStore)` - ready to serve reads and writes
    /// * `Err(StoreError)` - unreadable or corrupt backing file
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let tree = match &config.file_path {
            Some(file) => {
                let file_display = file.display().to_string();
                match tokio::fs::read_to_string(file).await {
                    Ok(raw) => {
                        let tree: Value =
                            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                                path: file_display.clone(),
                                message: e.to_string(),
                            })?;
                        if !tree.is_object() {
                            return Err(StoreError::Corrupt {
                                path: file_display,
                                message: "root is not a JSON object".to_string(),
                            });
                        }
                        info!(path = %file_display, "Loaded store file");
                        tree
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        if let Some(parent) = file.parent() {
                            tokio::fs::create_dir_all(parent)
                                .await
                                .map_err(|e| StoreError::io(&file_display, &e))?;
                        }
                        info!(path = %file_display, "Starting with empty tree");
                        Value::Object(Map::new())
                    }
                    Err(e) => return Err(StoreError::io(file_display, &e)),
                }
            }
            None => Value::Object(Map::new()),
        };

        Ok(JsonStore {
            config,
            tree: Mutex::new(tree),
        })
    }

    /// Returns a snapshot of the whole tree (for backup/export).
    pub async fn export(&self) -> Value {
        self.tree.lock().await.clone()
    }

    /// Persists `tree` to the backing file via temp file + rename.
    async fn flush(&self, tree: &Value) -> StoreResult<()> {
        let Some(file) = &self.config.file_path else {
            return Ok(());
        };
        let file_display = file.display().to_string();

        let raw = if self.config.pretty {
            serde_json::to_vec_pretty(tree)?
        } else {
            serde_json::to_vec(tree)?
        };

        let tmp = file.with_extension("json.tmp");
        tokio::fs::write(&tmp, &raw)
            .await
            .map_err(|e| StoreError::io(tmp.display().to_string(), &e))?;
        tokio::fs::rename(&tmp, file)
            .await
            .map_err(|e| StoreError::io(&file_display, &e))?;

        debug!(path = %file_display, bytes = raw.len(), "Flushed store file");
        Ok(())
    }
}

impl PersistenceGateway for JsonStore {
    async fn read(&self, tree_path: &str) -> StoreResult<Option<Value>> {
        let segs = path::segments(tree_path);
        let tree = self.tree.lock().await;
        let found = value_at(&tree, &segs).cloned();
        debug!(path = tree_path, hit = found.is_some(), "Tree read");
        Ok(found)
    }

    async fn write(&self, tree_path: &str, value: Value) -> StoreResult<()> {
        let segs = path::segments(tree_path);
        let mut tree = self.tree.lock().await;

        if let Some(offered) = revision_of(&value) {
            if let Some(stored) = value_at(&tree, &segs).and_then(revision_of) {
                if offered <= stored {
                    warn!(path = tree_path, stored, offered, "Rejecting stale write");
                    return Err(StoreError::StaleWrite {
                        path: tree_path.to_string(),
                        stored,
                        offered,
                    });
                }
            }
        }

        // Merge into a copy; memory is only updated once the file write
        // succeeded, so a failed flush leaves memory matching the disk.
        let mut next = tree.clone();
        merge_into(descend(&mut next, &segs), value);
        self.flush(&next).await?;
        *tree = next;

        debug!(path = tree_path, "Tree write committed");
        Ok(())
    }

    async fn write_at_root(&self, new_tree: Value) -> StoreResult<()> {
        if !new_tree.is_object() {
            return Err(StoreError::InvalidPath(
                "root value must be a JSON object".to_string(),
            ));
        }
        let mut tree = self.tree.lock().await;
        self.flush(&new_tree).await?;
        *tree = new_tree;
        info!("Tree replaced at root");
        Ok(())
    }
}

// =============================================================================
// Tree Navigation
// =============================================================================

fn value_at<'a>(tree: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    let mut cur = tree;
    for seg in segs {
        cur = cur.get(*seg)?;
    }
    Some(cur)
}

/// Walks to `segs`, materializing objects over any missing or non-object
/// nodes along the way.
fn descend<'a>(tree: &'a mut Value, segs: &[&str]) -> &'a mut Value {
    let mut cur = tree;
    for seg in segs {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        cur = match cur {
            Value::Object(map) => map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => unreachable!("node was just materialized as an object"),
        };
    }
    cur
}

/// Deep-merges objects key by key; anything else replaces the target.
fn merge_into(target: &mut Value, patch: Value) {
    if !patch.is_object() || !target.is_object() {
        *target = patch;
        return;
    }
    let Value::Object(patch_map) = patch else {
        return;
    };
    let Some(target_map) = target.as_object_mut() else {
        return;
    };
    for (key, value) in patch_map {
        if let Some(slot) = target_map.get_mut(&key) {
            merge_into(slot, value);
        } else {
            target_map.insert(key, value);
        }
    }
}

fn revision_of(value: &Value) -> Option<u64> {
    value.get("revision").and_then(Value::as_u64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_merge_write_preserves_siblings() {
        let store = JsonStore::open(StoreConfig::in_memory()).await.unwrap();

        store
            .write("branchData/b1", json!({ "products": [{"name": "ring"}] }))
            .await
            .unwrap();
        store
            .write("branchData/b1", json!({ "sales": [{"product": "ring"}] }))
            .await
            .unwrap();

        let branch = store.read("branchData/b1").await.unwrap().unwrap();
        assert_eq!(branch["products"][0]["name"], "ring");
        assert_eq!(branch["sales"][0]["product"], "ring");
    }

    #[tokio::test]
    async fn test_arrays_replace_wholesale() {
        let store = JsonStore::open(StoreConfig::in_memory()).await.unwrap();

        store
            .write("branchData/b1", json!({ "products": [1, 2, 3] }))
            .await
            .unwrap();
        store
            .write("branchData/b1", json!({ "products": [9] }))
            .await
            .unwrap();

        let branch = store.read("branchData/b1").await.unwrap().unwrap();
        assert_eq!(branch["products"], json!([9]));
    }

    #[tokio::test]
    async fn test_revision_cas_rejects_stale() {
        let store = JsonStore::open(StoreConfig::in_memory()).await.unwrap();

        store
            .write("branchData/b1", json!({ "revision": 1, "sales": [] }))
            .await
            .unwrap();

        // Same revision: someone else committed 1 already.
        let err = store
            .write("branchData/b1", json!({ "revision": 1, "sales": [1] }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleWrite { stored: 1, offered: 1, .. }));

        // Strictly newer revision goes through.
        store
            .write("branchData/b1", json!({ "revision": 2, "sales": [1] }))
            .await
            .unwrap();
        let branch = store.read("branchData/b1").await.unwrap().unwrap();
        assert_eq!(branch["revision"], 2);
    }

    #[tokio::test]
    async fn test_write_without_revision_skips_cas() {
        let store = JsonStore::open(StoreConfig::in_memory()).await.unwrap();
        store
            .write("branchMetadata/b1", json!({ "name": "downtown" }))
            .await
            .unwrap();
        store
            .write("branchMetadata/b1", json!({ "name": "renamed" }))
            .await
            .unwrap();
        let meta = store.read("branchMetadata/b1").await.unwrap().unwrap();
        assert_eq!(meta["name"], "renamed");
    }

    #[tokio::test]
    async fn test_read_missing_path() {
        let store = JsonStore::open(StoreConfig::in_memory()).await.unwrap();
        assert!(store.read("branchData/nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_root_export_and_replace() {
        let store = JsonStore::open(StoreConfig::in_memory()).await.unwrap();
        store
            .write_at_root(json!({ "branchData": {}, "branchMetadata": {} }))
            .await
            .unwrap();
        let tree = store.export().await;
        assert!(tree.get("branchData").is_some());

        let err = store.write_at_root(json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let file = std::env::temp_dir().join(format!(
            "argent-store-roundtrip-{}.json",
            std::process::id()
        ));
        let _ = tokio::fs::remove_file(&file).await;

        {
            let store = JsonStore::open(StoreConfig::new(&file)).await.unwrap();
            store
                .write("branchData/b1", json!({ "products": [{"name": "ring"}] }))
                .await
                .unwrap();
        }

        let reopened = JsonStore::open(StoreConfig::new(&file)).await.unwrap();
        let branch = reopened.read("branchData/b1").await.unwrap().unwrap();
        assert_eq!(branch["products"][0]["name"], "ring");

        let _ = tokio::fs::remove_file(&file).await;
    }
}
