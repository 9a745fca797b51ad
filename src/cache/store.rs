//! Artifact stores backing the composition cache

use super::CacheKey;
use crate::error::{LightsongError, Result};
use crate::export;
use crate::types::Composition;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Keyed persistence for finished compositions
pub trait ArtifactStore: Send + Sync {
    /// The stored composition for `key`, if any
    fn load(&self, key: &CacheKey) -> Result<Option<Composition>>;

    /// Persist `composition` under `key`, replacing anything already there
    fn store(&self, key: &CacheKey, composition: &Composition) -> Result<()>;

    /// Forget `key`; a missing entry is not an error
    fn remove(&self, key: &CacheKey) -> Result<()>;

    /// Get the name of this store (for logging)
    fn name(&self) -> &'static str;
}

/// JSON documents named after the cache key, in one directory
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact for `key` lives
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key.file_stem()))
    }

    /// Whether an artifact for `key` has been written
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }
}

impl ArtifactStore for DiskStore {
    fn load(&self, key: &CacheKey) -> Result<Option<Composition>> {
        Ok(export::read_json(&self.path_for(key)))
    }

    fn store(&self, key: &CacheKey, composition: &Composition) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| LightsongError::output_error(&self.root, e))?;
        export::write_json(composition, key, &self.path_for(key))
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed cached artifact {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LightsongError::output_error(path, e)),
        }
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, Composition>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Composition>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactStore for MemoryStore {
    fn load(&self, key: &CacheKey) -> Result<Option<Composition>> {
        Ok(self.entries().get(key).cloned())
    }

    fn store(&self, key: &CacheKey, composition: &Composition) -> Result<()> {
        self.entries().insert(key.clone(), composition.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Instrument, ScaleName};
    use tempfile::TempDir;

    fn composition() -> Composition {
        Composition {
            instruments: vec![Instrument::melodic("Cello")],
            duration: 30.0,
        }
    }

    #[test]
    fn test_disk_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path().join("cache"));
        let key = CacheKey::new("4912991", ScaleName::Marwa, 30.0);

        assert!(store.load(&key).unwrap().is_none());
        store.store(&key, &composition()).unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.load(&key).unwrap(), Some(composition()));

        store.remove(&key).unwrap();
        assert!(!store.contains(&key));
        store.remove(&key).unwrap();
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        let key = CacheKey::new("a", ScaleName::Blues, 10.0);
        store.store(&key, &composition()).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(composition()));
        store.remove(&key).unwrap();
        assert!(store.load(&key).unwrap().is_none());
    }
}
