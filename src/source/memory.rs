//! In-memory light curves, mainly for deterministic fixtures

use super::{LightCurveSource, StarEntry};
use crate::error::{LightsongError, Result};
use crate::types::LightCurveSegment;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed set of already-clean segments keyed by id
#[derive(Debug, Default)]
pub struct InMemorySource {
    stars: BTreeMap<String, Vec<LightCurveSegment>>,
    loads: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_star(mut self, id: impl Into<String>, segments: Vec<LightCurveSegment>) -> Self {
        self.stars.insert(id.into(), segments);
        self
    }

    /// How many times `load` has been called
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl LightCurveSource for InMemorySource {
    fn load(&self, id: &str) -> Result<Vec<LightCurveSegment>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.stars
            .get(id)
            .cloned()
            .ok_or_else(|| LightsongError::StarNotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<StarEntry>> {
        Ok(self
            .stars
            .keys()
            .map(|id| StarEntry {
                id: id.clone(),
                name: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_loads() {
        let seg = LightCurveSegment::new(vec![0.0, 1.0], vec![1.0, 2.0]).unwrap();
        let source = InMemorySource::new().with_star("b", vec![seg.clone()]).with_star("a", vec![]);

        assert_eq!(source.load("b").unwrap(), vec![seg]);
        assert!(source.load("zzz").is_err());
        assert_eq!(source.load_count(), 2);

        let ids: Vec<String> = source.list().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
