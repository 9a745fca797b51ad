//! Quantile-based quantization of a contour into scale symbols
//!
//! Thresholds sit at the empirical quantiles `0, 1/n, ..., (n-1)/n` of the
//! contour, so every symbol is used for roughly the same share of time.
//! Quantiles use plotting positions with alpha = beta = 0.4.

use crate::error::{LightsongError, Result};
use serde::{Deserialize, Serialize};

/// Plotting-position parameters for the empirical quantiles
const ALPHA_P: f64 = 0.4;
const BETA_P: f64 = 0.4;

/// What happens to samples at or above the highest threshold
///
/// `Wrap` reproduces the historical behaviour where a sample with no
/// threshold above it falls through to symbol 0. `Clamp` assigns every
/// sample its bucket index, so the loudest samples get the top symbol and
/// a rising contour never produces a falling symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingPolicy {
    /// Symbol = index of the first threshold strictly above the sample; none → 0
    Wrap,
    /// Symbol = index of the last threshold at or below the sample
    #[default]
    Clamp,
}

/// Empirical quantiles of `values` at each probability in `probs`
pub fn quantiles(values: &[f64], probs: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    if n == 1 {
        return vec![sorted[0]; probs.len()];
    }

    let nf = n as f64;
    probs
        .iter()
        .map(|&p| {
            let m = ALPHA_P + p * (1.0 - ALPHA_P - BETA_P);
            let aleph = nf * p + m;
            let k = aleph.clamp(1.0, nf - 1.0).floor();
            let gamma = (aleph - k).clamp(0.0, 1.0);
            let k = k as usize;
            (1.0 - gamma) * sorted[k - 1] + gamma * sorted[k]
        })
        .collect()
}

/// Ascending thresholds for `n_bins` symbols
pub fn thresholds(contour: &[f64], n_bins: usize) -> Vec<f64> {
    let probs: Vec<f64> = (0..n_bins).map(|i| i as f64 / n_bins as f64).collect();
    quantiles(contour, &probs)
}

/// Map every contour sample to a symbol in `[0, n_scale_tones * n_octaves)`
pub fn quantize(
    contour: &[f64],
    n_scale_tones: usize,
    n_octaves: usize,
    policy: CeilingPolicy,
) -> Result<Vec<usize>> {
    let n_bins = n_scale_tones * n_octaves;
    if n_bins == 0 {
        return Err(LightsongError::InvalidInput(
            "quantizer needs at least one scale tone and one octave".to_string(),
        ));
    }
    if contour.is_empty() {
        return Err(LightsongError::InvalidInput(
            "cannot quantize an empty contour".to_string(),
        ));
    }

    let thresholds = thresholds(contour, n_bins);

    let symbols = contour
        .iter()
        .map(|&value| {
            // Number of thresholds at or below the sample
            let below = thresholds.partition_point(|&t| t <= value);
            match policy {
                CeilingPolicy::Wrap => {
                    if below == n_bins {
                        0
                    } else {
                        below
                    }
                }
                CeilingPolicy::Clamp => below.saturating_sub(1),
            }
        })
        .collect();

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_match_plotting_positions() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let q = thresholds(&values, 3);
        assert_eq!(q.len(), 3);
        assert_eq!(q[0], 0.0);
        assert_eq!(q[1], 0.0);
        assert!((q[2] - 8.0 / 15.0).abs() < 1e-12, "{:?}", q);
    }

    #[test]
    fn test_symbols_in_range() {
        let contour: Vec<f64> = (0..97).map(|i| ((i * 37) % 97) as f64 / 96.0).collect();
        for policy in [CeilingPolicy::Wrap, CeilingPolicy::Clamp] {
            let symbols = quantize(&contour, 6, 4, policy).unwrap();
            assert_eq!(symbols.len(), contour.len());
            assert!(symbols.iter().all(|&s| s < 24));
        }
    }

    #[test]
    fn test_monotone_input_gives_monotone_symbols() {
        let contour: Vec<f64> = (0..50).map(|i| i as f64 / 49.0).collect();
        let symbols = quantize(&contour, 5, 2, CeilingPolicy::Clamp).unwrap();
        assert!(symbols.windows(2).all(|w| w[0] <= w[1]), "{:?}", symbols);
        assert_eq!(symbols[0], 0);
        assert_eq!(*symbols.last().unwrap(), 9);
    }

    #[test]
    fn test_wrap_sends_ceiling_to_zero() {
        let contour: Vec<f64> = (0..50).map(|i| i as f64 / 49.0).collect();
        let wrap = quantize(&contour, 5, 2, CeilingPolicy::Wrap).unwrap();
        let clamp = quantize(&contour, 5, 2, CeilingPolicy::Clamp).unwrap();

        // The maximum has no threshold above it.
        assert_eq!(*wrap.last().unwrap(), 0);
        assert_eq!(*clamp.last().unwrap(), 9);

        // Below the ceiling the two policies differ by exactly one step.
        for (w, c) in wrap.iter().zip(&clamp) {
            if *w != 0 {
                assert_eq!(*w, c + 1);
            }
        }
    }

    #[test]
    fn test_step_contour_symbols() {
        let contour = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let clamp = quantize(&contour, 3, 1, CeilingPolicy::Clamp).unwrap();
        assert_eq!(clamp, vec![1, 1, 1, 2, 2, 2, 1, 1, 1]);

        let wrap = quantize(&contour, 3, 1, CeilingPolicy::Wrap).unwrap();
        assert_eq!(wrap, vec![2, 2, 2, 0, 0, 0, 2, 2, 2]);
    }

    #[test]
    fn test_constant_contour_single_symbol() {
        let symbols = quantize(&[0.0; 20], 6, 4, CeilingPolicy::Clamp).unwrap();
        assert!(symbols.iter().all(|&s| s == symbols[0]));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(quantize(&[], 6, 4, CeilingPolicy::Clamp).is_err());
        assert!(quantize(&[0.5], 0, 4, CeilingPolicy::Clamp).is_err());
    }
}
