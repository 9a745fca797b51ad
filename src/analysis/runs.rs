//! Run-length compression of quantized symbols into sustained intervals

use crate::error::{LightsongError, Result};
use crate::types::Run;

/// Consecutive sample pairs `(t[i], t[i + 1])`
pub fn intervals(time: &[f64]) -> Vec<(f64, f64)> {
    time.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Collapse `(interval, symbol)` pairs into maximal constant-symbol runs
///
/// Runs are emitted in time order and tile the intervals exactly: each run
/// starts where the previous one ended.
pub fn compress_runs(intervals: &[(f64, f64)], symbols: &[usize]) -> Result<Vec<Run>> {
    if intervals.len() != symbols.len() {
        return Err(LightsongError::InvalidInput(format!(
            "{} intervals paired with {} symbols",
            intervals.len(),
            symbols.len()
        )));
    }
    if intervals.is_empty() {
        return Ok(Vec::new());
    }

    // Indices where a new run begins; 0 always does.
    let starts: Vec<usize> = std::iter::once(0)
        .chain((1..symbols.len()).filter(|&i| symbols[i] != symbols[i - 1]))
        .collect();

    let runs = starts
        .iter()
        .enumerate()
        .map(|(k, &first)| {
            let last = starts.get(k + 1).map_or(symbols.len(), |&next| next) - 1;
            Run {
                start: intervals[first].0,
                end: intervals[last].1,
                symbol: symbols[first],
            }
        })
        .collect();

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Expand runs back into one symbol per interval
    fn expand(runs: &[Run], intervals: &[(f64, f64)]) -> Vec<usize> {
        intervals
            .iter()
            .map(|&(s, _)| {
                runs.iter()
                    .find(|r| r.start <= s && s < r.end)
                    .map(|r| r.symbol)
                    .expect("interval not covered by any run")
            })
            .collect()
    }

    #[test]
    fn test_single_run_when_constant() {
        let iv = intervals(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let runs = compress_runs(&iv, &[3, 3, 3, 3]).unwrap();
        assert_eq!(
            runs,
            vec![Run {
                start: 0.0,
                end: 4.0,
                symbol: 3
            }]
        );
    }

    #[test]
    fn test_alternating_gives_one_run_per_pair() {
        let time: Vec<f64> = (0..7).map(|i| i as f64).collect();
        let iv = intervals(&time);
        let runs = compress_runs(&iv, &[1, 2, 1, 2, 1, 2]).unwrap();
        assert_eq!(runs.len(), 6);
        for (r, &(s, e)) in runs.iter().zip(&iv) {
            assert_eq!((r.start, r.end), (s, e));
        }
    }

    #[test]
    fn test_runs_partition_time_and_round_trip() {
        let time: Vec<f64> = (0..13).map(|i| i as f64 * 0.5 + 10.0).collect();
        let iv = intervals(&time);
        let symbols = vec![4, 4, 0, 0, 0, 7, 1, 1, 1, 1, 2, 2];
        let runs = compress_runs(&iv, &symbols).unwrap();

        assert_eq!(runs.len(), 5);
        assert_eq!(runs[0].start, time[0]);
        assert_eq!(runs.last().unwrap().end, *time.last().unwrap());
        for pair in runs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].end > pair[0].start);
        }
        assert_eq!(expand(&runs, &iv), symbols);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let iv = intervals(&[0.0, 1.0, 2.0]);
        assert!(compress_runs(&iv, &[1]).is_err());
        assert!(compress_runs(&[], &[]).unwrap().is_empty());
    }
}
