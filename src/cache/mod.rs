//! Memoization of finished compositions
//!
//! A composition is identified by (object id, scale, section duration),
//! qualified by a fingerprint of the remaining composition parameters.
//! Lookups are single-flight: concurrent callers asking for the same key
//! wait on one computation instead of racing to produce it.

pub mod store;

pub use store::{ArtifactStore, DiskStore, MemoryStore};

use crate::error::Result;
use crate::types::{Composition, ScaleName};
use hash32::FnvHasher;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Identity of one composition request
#[derive(Debug, Clone)]
pub struct CacheKey {
    pub id: String,
    pub scale: ScaleName,
    /// Seconds per section
    pub duration: f64,
    /// Fingerprint of the other parameters the composition depends on
    pub variant: u32,
}

impl CacheKey {
    pub fn new(id: impl Into<String>, scale: ScaleName, duration: f64) -> Self {
        Self {
            id: id.into(),
            scale,
            duration,
            variant: 0,
        }
    }

    pub fn with_variant(mut self, variant: u32) -> Self {
        self.variant = variant;
        self
    }

    /// Deterministic 32-bit FNV-1a fingerprint of the full key
    pub fn fingerprint(&self) -> u32 {
        use hash32::Hasher as Hash32Hasher;

        let mut hasher = FnvHasher::default();
        hasher.write(self.id.as_bytes());
        hasher.write(&[0]);
        hasher.write(self.scale.as_str().as_bytes());
        hasher.write(&[0]);
        hasher.write(&self.duration.to_bits().to_le_bytes());
        hasher.write(&self.variant.to_le_bytes());
        hasher.finish32()
    }

    /// File name stem for artifacts, e.g. `4912991_jazz_minor_90_5e1c0a7b`
    ///
    /// The fingerprint keeps ids that sanitize to the same text apart.
    pub fn file_stem(&self) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}_{}_{}_{:08x}", id, self.scale, self.duration, self.fingerprint())
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.scale == other.scale
            && self.duration.to_bits() == other.duration.to_bits()
            && self.variant == other.variant
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.scale.hash(state);
        self.duration.to_bits().hash(state);
        self.variant.hash(state);
    }
}

/// Where a cached composition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Already in memory or in the store
    Hit,
    /// Computed by this call
    Computed,
}

type Slot = Arc<OnceCell<Arc<Composition>>>;

/// Single-flight cache in front of an artifact store
pub struct CompositionCache {
    store: Arc<dyn ArtifactStore>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl CompositionCache {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// The composition for `key`, running `compose` at most once per key
    ///
    /// Callers racing on one key block until the first finishes. If
    /// `compose` fails the slot stays empty and the error goes to that
    /// caller only; a later call computes afresh.
    pub fn get_or_compose<F>(&self, key: &CacheKey, compose: F) -> Result<(Arc<Composition>, CacheOutcome)>
    where
        F: FnOnce() -> Result<Composition>,
    {
        let slot = self.slot(key);
        let mut outcome = CacheOutcome::Hit;

        let composition = slot.get_or_try_init(|| -> Result<Arc<Composition>> {
            if let Some(stored) = self.store.load(key)? {
                debug!("Cache hit for {} in {} store", key.file_stem(), self.store.name());
                return Ok(Arc::new(stored));
            }

            debug!("Cache miss for {}, composing", key.file_stem());
            outcome = CacheOutcome::Computed;
            let composition = compose()?;
            self.store.store(key, &composition)?;
            Ok(Arc::new(composition))
        })?;

        Ok((Arc::clone(composition), outcome))
    }

    /// Drop `key` from memory and from the store
    pub fn invalidate(&self, key: &CacheKey) -> Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        self.store.remove(key)
    }
}
