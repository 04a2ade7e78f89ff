//! Keyed storage of persisted trees.

use crate::scene::serialization::PersistedTree;
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported store schema version {0}")]
    UnsupportedSchema(u32),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Document store of persisted trees keyed by their root id.
pub trait HoloStore {
    /// Insert or replace the tree stored under `tree.id`.
    fn put(&mut self, tree: PersistedTree) -> Result<()>;
    /// Every stored tree, ordered by id.
    fn get_all(&self) -> Result<Vec<PersistedTree>>;
    fn delete(&mut self, id: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    holos: BTreeMap<String, PersistedTree>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.holos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holos.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.holos.contains_key(id)
    }
}

impl HoloStore for MemoryStore {
    fn put(&mut self, tree: PersistedTree) -> Result<()> {
        self.holos.insert(tree.id.clone(), tree);
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<PersistedTree>> {
        Ok(self.holos.values().cloned().collect())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.holos.remove(id);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    holos: Vec<PersistedTree>,
}

/// Store backed by a single pretty-printed JSON file, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: MemoryStore,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut cache = MemoryStore::default();
        if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            let document: StoreDocument = serde_json::from_str(&json)?;
            if document.version != SCHEMA_VERSION {
                return Err(StoreError::UnsupportedSchema(document.version));
            }
            for tree in document.holos {
                cache.put(tree)?;
            }
        }
        log::info!("opened store {} with {} tree(s)", path.display(), cache.len());
        Ok(Self { path, cache })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let document = StoreDocument {
            version: SCHEMA_VERSION,
            holos: self.cache.get_all()?,
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl HoloStore for JsonFileStore {
    fn put(&mut self, tree: PersistedTree) -> Result<()> {
        self.cache.put(tree)?;
        self.flush()
    }

    fn get_all(&self) -> Result<Vec<PersistedTree>> {
        self.cache.get_all()
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        if !self.cache.contains(id) {
            return Ok(());
        }
        self.cache.delete(id)?;
        self.flush()
    }
}

/// Delete every stored tree whose id is no longer in the live scene.
///
/// A failed delete is logged and the sweep moves on. Returns the ids that
/// were removed.
pub fn sweep_orphans(store: &mut impl HoloStore, scene: &Scene) -> Result<Vec<String>> {
    let mut deleted = Vec::new();
    for tree in store.get_all()? {
        if scene.contains_id(&tree.id) {
            continue;
        }
        match store.delete(&tree.id) {
            Ok(()) => deleted.push(tree.id),
            Err(err) => log::warn!("failed to delete orphaned tree {}: {err}", tree.id),
        }
    }
    log::info!("swept {} orphaned tree(s)", deleted.len());
    Ok(deleted)
}
