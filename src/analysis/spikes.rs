//! Transient detection for the percussion layer
//!
//! Flux is divided by a running median of the negated flux, which tracks
//! the local baseline. For positive flux the ratio sits near -1 and rises
//! toward 0 wherever brightness departs sharply downward from its
//! neighbourhood (a transit). Everything under the median ratio is
//! flattened, so only those excursions survive. Onsets are then picked as
//! well-separated local maxima of that signal.

use super::filter::{check_window, median, median_filter, rescale_unit};
use crate::error::{LightsongError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Normalized transient strength per sample
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeSignal {
    /// Values in [0, 1]
    pub values: Vec<f64>,
    /// True when no sample rose above the median ratio
    pub degenerate: bool,
}

/// Build the spike signal for `flux` using a median window of width `window`
pub fn spike_signal(flux: &[f64], window: usize) -> Result<SpikeSignal> {
    check_window(window)?;
    if flux.len() < window {
        return Err(LightsongError::insufficient(format!(
            "{} samples is shorter than the spike window of {}",
            flux.len(),
            window
        )));
    }

    let negated: Vec<f64> = flux.iter().map(|f| -f).collect();
    let baseline = median_filter(&negated, window)?;

    let mut ratio: Vec<f64> = flux
        .iter()
        .zip(&baseline)
        .map(|(f, &b)| {
            let b = if b == 0.0 { 1.0 } else { b };
            f / b
        })
        .collect();

    let floor = median(&ratio).unwrap_or(0.0);
    for r in ratio.iter_mut() {
        if *r < floor {
            *r = floor;
        }
    }

    let degenerate = !rescale_unit(&mut ratio);
    if degenerate {
        debug!("No transients over {} samples", flux.len());
    }

    Ok(SpikeSignal {
        values: ratio,
        degenerate,
    })
}

/// Local-maximum onset picking parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPickParams {
    /// Samples before the candidate included in the maximum window
    pub pre_max: usize,
    /// Samples after the candidate included in the maximum window
    pub post_max: usize,
    /// Samples before the candidate included in the mean window
    pub pre_avg: usize,
    /// Samples after the candidate included in the mean window
    pub post_avg: usize,
    /// Margin a peak must clear above the local mean
    pub delta: f64,
    /// Samples to wait after an accepted onset
    pub wait: usize,
}

impl Default for PeakPickParams {
    fn default() -> Self {
        Self {
            pre_max: 3,
            post_max: 3,
            pre_avg: 5,
            post_avg: 5,
            delta: 0.5,
            wait: 10,
        }
    }
}

impl PeakPickParams {
    /// Both windows must reach past the candidate sample, and `delta` must be a real margin
    pub fn validate(&self) -> Result<()> {
        if self.post_max == 0 || self.post_avg == 0 {
            return Err(LightsongError::InvalidInput(format!(
                "peak windows must include the candidate (post_max {}, post_avg {})",
                self.post_max, self.post_avg
            )));
        }
        if !(self.delta.is_finite() && self.delta >= 0.0) {
            return Err(LightsongError::InvalidInput(format!(
                "peak delta must be a non-negative number, got {}",
                self.delta
            )));
        }
        Ok(())
    }
}

/// Indices of onsets in `signal`, strictly increasing
///
/// A sample `n` is accepted when it equals the maximum of
/// `signal[n - pre_max .. n + post_max]`, is at least `delta` above the mean
/// of `signal[n - pre_avg .. n + post_avg]`, and comes more than `wait`
/// samples after the previous onset. Windows are clipped at the edges and
/// the mean is taken over the clipped window only. Parameters that fail
/// [`PeakPickParams::validate`] yield no onsets.
pub fn pick_onsets(signal: &[f64], params: &PeakPickParams) -> Vec<usize> {
    let n = signal.len();
    let mut onsets = Vec::new();
    if let Err(e) = params.validate() {
        debug!("No onsets picked: {}", e);
        return onsets;
    }
    let mut last: Option<usize> = None;

    for (i, &value) in signal.iter().enumerate() {
        if value <= 0.0 {
            continue;
        }
        if let Some(prev) = last {
            if i <= prev + params.wait {
                continue;
            }
        }

        let max_window = &signal[i.saturating_sub(params.pre_max)..(i + params.post_max).min(n)];
        let local_max = max_window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if value != local_max {
            continue;
        }

        let avg_window = &signal[i.saturating_sub(params.pre_avg)..(i + params.post_avg).min(n)];
        let local_mean = avg_window.iter().sum::<f64>() / avg_window.len() as f64;
        if value < local_mean + params.delta {
            continue;
        }

        trace!("Onset at sample {} (strength {:.3})", i, value);
        onsets.push(i);
        last = Some(i);
    }

    onsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dipping_flux(len: usize, dips: &[usize]) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let base = 1000.0 + 2.0 * (i as f64 / 9.0).sin();
                if dips.contains(&i) {
                    base * 0.5
                } else {
                    base
                }
            })
            .collect()
    }

    #[test]
    fn test_spike_signal_range() {
        let flux = dipping_flux(120, &[30, 80]);
        let signal = spike_signal(&flux, 15).unwrap();
        assert_eq!(signal.values.len(), flux.len());
        assert!(!signal.degenerate);
        assert!(signal.values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_spike_signal_constant_is_degenerate() {
        let signal = spike_signal(&[42.0; 20], 15).unwrap();
        assert!(signal.degenerate);
        assert!(signal.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_spike_signal_zero_flux_guarded() {
        let signal = spike_signal(&[0.0; 20], 15).unwrap();
        assert!(signal.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_spike_signal_too_short() {
        assert!(matches!(
            spike_signal(&[1.0; 5], 15),
            Err(LightsongError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_onsets_found_at_dips() {
        let flux = dipping_flux(120, &[30, 80]);
        let signal = spike_signal(&flux, 15).unwrap();
        let onsets = pick_onsets(&signal.values, &PeakPickParams::default());
        assert_eq!(onsets, vec![30, 80]);
    }

    #[test]
    fn test_onsets_respect_wait() {
        let mut signal = vec![0.0; 60];
        for i in (2..60).step_by(4) {
            signal[i] = 1.0;
        }
        let params = PeakPickParams {
            delta: 0.1,
            ..PeakPickParams::default()
        };
        let onsets = pick_onsets(&signal, &params);
        assert!(!onsets.is_empty());
        assert!(onsets.windows(2).all(|w| w[1] - w[0] > params.wait), "{:?}", onsets);
    }

    #[test]
    fn test_no_onsets_in_flat_signal() {
        assert!(pick_onsets(&[0.0; 40], &PeakPickParams::default()).is_empty());
        assert!(pick_onsets(&[0.3; 40], &PeakPickParams::default()).is_empty());
    }

    #[test]
    fn test_zero_width_windows_rejected() {
        let mut signal = vec![0.0; 30];
        signal[1] = 0.1;
        let params = PeakPickParams {
            pre_avg: 0,
            post_avg: 0,
            delta: 10.0,
            ..PeakPickParams::default()
        };
        assert!(params.validate().is_err());
        assert!(pick_onsets(&signal, &params).is_empty());

        let no_max = PeakPickParams {
            post_max: 0,
            ..PeakPickParams::default()
        };
        assert!(no_max.validate().is_err());
        assert!(PeakPickParams { delta: f64::NAN, ..PeakPickParams::default() }
            .validate()
            .is_err());
        assert!(PeakPickParams::default().validate().is_ok());
    }

    #[test]
    fn test_edge_mean_uses_clipped_window() {
        // At sample 0 the mean window is [0, 5): (1.0 + 0.9) / 5 = 0.38
        let mut signal = vec![0.0; 20];
        signal[0] = 1.0;
        signal[1] = 0.9;

        let strict = PeakPickParams {
            delta: 0.7,
            ..PeakPickParams::default()
        };
        assert!(pick_onsets(&signal, &strict).is_empty());

        let loose = PeakPickParams {
            delta: 0.6,
            ..PeakPickParams::default()
        };
        assert_eq!(pick_onsets(&signal, &loose), vec![0]);
    }
}
