//! Light-curve acquisition
//!
//! The pipeline never fetches data itself; a `LightCurveSource` is handed
//! in. Sources hand out only segments that already satisfy the loader
//! contract: finite samples, strictly increasing time, and a minimum span.

pub mod directory;
pub mod memory;

pub use directory::{find_data_dir, DirectorySource};
pub use memory::InMemorySource;

use crate::analysis::filter::median;
use crate::error::Result;
use crate::types::LightCurveSegment;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Shortest segment span, in time units, the loader passes on
pub const DEFAULT_MIN_SPAN: f64 = 70.0;

/// Catalog entry for one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarEntry {
    pub id: String,
    pub name: Option<String>,
}

/// Supplier of light curves and the catalog of available objects
pub trait LightCurveSource: Send + Sync {
    /// All usable segments for `id`, in time order
    fn load(&self, id: &str) -> Result<Vec<LightCurveSegment>>;

    /// Objects this source can load
    fn list(&self) -> Result<Vec<StarEntry>>;

    /// Get the name of this source (for logging)
    fn name(&self) -> &'static str;
}

/// How samples with a non-finite flux are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Remove the sample
    #[default]
    Drop,
    /// Replace the flux with the median of the finite fluxes
    ImputeMedian,
}

/// Loader-side cleaning rules applied to every raw segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentFilter {
    pub min_span: f64,
    pub non_finite: NonFinitePolicy,
}

impl Default for SegmentFilter {
    fn default() -> Self {
        Self {
            min_span: DEFAULT_MIN_SPAN,
            non_finite: NonFinitePolicy::Drop,
        }
    }
}

impl SegmentFilter {
    /// Clean one raw segment, or `None` if nothing usable is left
    ///
    /// Samples with non-finite time are always dropped. Segments spanning
    /// less than `min_span`, or whose time is not strictly increasing once
    /// cleaned, are discarded.
    pub fn clean(&self, time: &[f64], flux: &[f64]) -> Option<LightCurveSegment> {
        let fill = match self.non_finite {
            NonFinitePolicy::Drop => None,
            NonFinitePolicy::ImputeMedian => {
                let finite: Vec<f64> = flux.iter().copied().filter(|f| f.is_finite()).collect();
                median(&finite)
            }
        };

        let (time, flux): (Vec<f64>, Vec<f64>) = time
            .iter()
            .zip(flux)
            .filter(|(t, _)| t.is_finite())
            .filter_map(|(&t, &f)| match (f.is_finite(), fill) {
                (true, _) => Some((t, f)),
                (false, Some(m)) => Some((t, m)),
                (false, None) => None,
            })
            .unzip();

        let segment = match LightCurveSegment::new(time, flux) {
            Ok(segment) => segment,
            Err(e) => {
                debug!("Discarding segment: {}", e);
                return None;
            }
        };

        if segment.span() < self.min_span {
            trace!(
                "Discarding segment spanning {:.1} (< {:.1})",
                segment.span(),
                self.min_span
            );
            return None;
        }

        Some(segment)
    }
}
