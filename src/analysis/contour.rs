//! Slow-trend contour extraction
//!
//! The contour is the melodic backbone: spikes are filtered out, the
//! linear trend is removed, and the result is stretched onto [0, 1].

use super::filter::{check_window, detrend_linear, median_filter, rescale_unit};
use crate::error::{LightsongError, Result};
use tracing::debug;

/// Default median filter width
pub const DEFAULT_WINDOW: usize = 15;

/// Normalized contour of a flux series
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    /// Values in [0, 1]; min 0 and max 1 unless degenerate
    pub values: Vec<f64>,
    /// True when the filtered signal had no variation and was flattened to zero
    pub degenerate: bool,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Smooth, detrend and normalize `flux` with a median filter of width `window`
pub fn extract_contour(flux: &[f64], window: usize) -> Result<Contour> {
    check_window(window)?;
    if flux.len() < window {
        return Err(LightsongError::insufficient(format!(
            "{} samples is shorter than the contour window of {}",
            flux.len(),
            window
        )));
    }

    let filtered = median_filter(flux, window)?;
    let mut values = detrend_linear(&filtered);
    let degenerate = !rescale_unit(&mut values);

    if degenerate {
        debug!("Flat contour over {} samples, using constant zero", flux.len());
    }

    Ok(Contour { values, degenerate })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_max(v: &[f64]) -> (f64, f64) {
        v.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
    }

    #[test]
    fn test_contour_spans_unit_interval() {
        let flux: Vec<f64> = (0..200)
            .map(|i| 1000.0 + 25.0 * (i as f64 / 17.0).sin() + 0.3 * i as f64)
            .collect();
        let contour = extract_contour(&flux, DEFAULT_WINDOW).unwrap();

        assert_eq!(contour.len(), flux.len());
        assert!(!contour.degenerate);
        let (lo, hi) = min_max(&contour.values);
        assert_eq!(lo, 0.0);
        assert!((hi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_contour_step() {
        let flux = [1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0];
        let contour = extract_contour(&flux, 3).unwrap();
        let expected = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        for (got, want) in contour.values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{:?}", contour.values);
        }
    }

    #[test]
    fn test_contour_constant_is_degenerate() {
        let contour = extract_contour(&[7.5; 20], DEFAULT_WINDOW).unwrap();
        assert!(contour.degenerate);
        assert_eq!(contour.values, vec![0.0; 20]);
    }

    #[test]
    fn test_contour_too_short() {
        let err = extract_contour(&[1.0; 10], DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(err, LightsongError::InsufficientData { .. }));
    }
}
