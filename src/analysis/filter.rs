//! Array primitives shared by the contour and spike extractors
//!
//! The median filter zero-pads at both ends, so samples within half a
//! window of an edge see zeros in their neighbourhood.

use crate::error::{LightsongError, Result};

/// Relative range below which a signal is treated as constant
const DEGENERATE_TOLERANCE: f64 = 1e-9;

/// Centered running median of odd width `window`, zero-padded at the edges
pub fn median_filter(signal: &[f64], window: usize) -> Result<Vec<f64>> {
    check_window(window)?;

    let half = window / 2;
    let n = signal.len();
    let mut scratch = Vec::with_capacity(window);

    let filtered = (0..n)
        .map(|i| {
            scratch.clear();
            for k in 0..window {
                // i + k - half, with anything outside the signal read as zero
                let j = (i + k).checked_sub(half);
                let value = match j {
                    Some(j) if j < n => signal[j],
                    _ => 0.0,
                };
                scratch.push(value);
            }
            scratch.sort_by(f64::total_cmp);
            scratch[half]
        })
        .collect();

    Ok(filtered)
}

/// Subtract the least-squares line through `(index, value)`
pub fn detrend_linear(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = signal.iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, &y) in signal.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    signal
        .iter()
        .enumerate()
        .map(|(i, &y)| y - (intercept + slope * i as f64))
        .collect()
}

/// Median of a slice; the mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Shift to min 0 and scale to max 1 in place
///
/// Returns false and zeroes the signal when its range collapses, instead
/// of dividing by (near) zero.
pub fn rescale_unit(signal: &mut [f64]) -> bool {
    let (min, max) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    let magnitude = min.abs().max(max.abs());

    if signal.is_empty() || !(range > DEGENERATE_TOLERANCE * (1.0 + magnitude)) {
        signal.iter_mut().for_each(|v| *v = 0.0);
        return false;
    }

    for v in signal.iter_mut() {
        *v = (*v - min) / range;
    }
    true
}

/// Reject even or zero window widths
pub fn check_window(window: usize) -> Result<()> {
    if window == 0 || window % 2 == 0 {
        return Err(LightsongError::InvalidInput(format!(
            "filter window must be odd and positive, got {}",
            window
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_filter_removes_spike() {
        let signal = [1.0, 1.0, 1.0, 9.0, 1.0, 1.0, 1.0];
        let filtered = median_filter(&signal, 3).unwrap();
        assert_eq!(filtered, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_median_filter_zero_pads_edges() {
        let signal = [4.0, 4.0, 4.0, 4.0, 4.0];
        let filtered = median_filter(&signal, 5).unwrap();
        // Edge windows hold two zeros and three fours; median is still 4.
        assert_eq!(filtered, vec![4.0; 5]);

        let filtered = median_filter(&[4.0, 4.0], 5).unwrap();
        assert_eq!(filtered, vec![0.0, 0.0]);
    }

    #[test]
    fn test_median_filter_rejects_even_window() {
        assert!(median_filter(&[1.0, 2.0], 4).is_err());
        assert!(median_filter(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_detrend_removes_line() {
        let line: Vec<f64> = (0..10).map(|i| 3.0 + 0.5 * i as f64).collect();
        let residual = detrend_linear(&line);
        assert!(residual.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_rescale_unit() {
        let mut v = vec![2.0, 4.0, 3.0];
        assert!(rescale_unit(&mut v));
        assert_eq!(v, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_rescale_unit_degenerate() {
        let mut v = vec![5.0; 4];
        assert!(!rescale_unit(&mut v));
        assert_eq!(v, vec![0.0; 4]);

        // Round-off noise around a constant is still constant
        let mut v = vec![1e-17, -1e-17, 0.0];
        assert!(!rescale_unit(&mut v));
    }
}
