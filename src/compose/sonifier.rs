//! Request-level entry point: id + scale + duration → composition

use super::orchestrator::CompositionOrchestrator;
use super::params::ComposeParams;
use crate::cache::{ArtifactStore, CacheKey, CacheOutcome, CompositionCache};
use crate::error::Result;
use crate::source::LightCurveSource;
use crate::types::{Composition, Scale, ScaleName};
use std::sync::Arc;
use tracing::{debug, info};

/// Loads light curves, composes them, and memoizes the result
pub struct Sonifier {
    source: Arc<dyn LightCurveSource>,
    cache: CompositionCache,
    params: ComposeParams,
}

impl Sonifier {
    pub fn new(
        source: Arc<dyn LightCurveSource>,
        store: Arc<dyn ArtifactStore>,
        params: ComposeParams,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            source,
            cache: CompositionCache::new(store),
            params,
        })
    }

    pub fn params(&self) -> &ComposeParams {
        &self.params
    }

    /// Composition for `id` in `scale` with `duration` seconds per section
    ///
    /// Repeated requests with the same identity return the cached value
    /// without touching the light-curve source again.
    pub fn compose(
        &self,
        id: &str,
        scale: ScaleName,
        duration: f64,
    ) -> Result<(Arc<Composition>, CacheOutcome)> {
        let key = self.key(id, scale, duration);
        let (composition, outcome) = self.cache.get_or_compose(&key, || {
            let orchestrator =
                CompositionOrchestrator::new(self.params.clone().with_duration(duration))?;
            debug!("Loading {} from {} source", id, self.source.name());
            let segments = self.source.load(id)?;
            orchestrator.compose(&segments, &Scale::from(scale))
        })?;

        if outcome == CacheOutcome::Computed {
            info!(
                "Composed {} in {}: {:.0}s, {} instruments, {} notes",
                id,
                scale,
                composition.duration,
                composition.instruments.len(),
                composition.note_count()
            );
        }
        Ok((composition, outcome))
    }

    /// Forget any cached composition for this identity
    pub fn invalidate(&self, id: &str, scale: ScaleName, duration: f64) -> Result<()> {
        self.cache.invalidate(&self.key(id, scale, duration))
    }

    /// Cache identity of a request under this sonifier's parameters
    pub fn key(&self, id: &str, scale: ScaleName, duration: f64) -> CacheKey {
        CacheKey::new(id, scale, duration).with_variant(self.params.fingerprint())
    }
}
