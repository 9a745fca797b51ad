//! Multi-section, multi-pass composition assembly
//!
//! Sections follow each other on the timeline; the passes inside one
//! section are layered on top of each other.

use super::params::ComposeParams;
use super::voice::{check_segment, compose_voice};
use crate::error::{LightsongError, Result};
use crate::types::{Composition, LightCurveSegment, Scale};
use tracing::{debug, warn};

/// Builds whole compositions from a list of segments
#[derive(Debug, Clone)]
pub struct CompositionOrchestrator {
    params: ComposeParams,
}

impl CompositionOrchestrator {
    pub fn new(params: ComposeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ComposeParams {
        &self.params
    }

    /// Number of sections `usable` segments can fill
    pub fn section_count(&self, usable: usize) -> usize {
        usable
            .saturating_sub(self.params.max_segment_offset())
            .min(self.params.sections)
    }

    /// Compose `segments` in `scale`
    ///
    /// Segments too short for the filter window are skipped with a warning.
    /// Section `i` starts at `i * duration`; every pass contributes one
    /// melodic and one percussive instrument per section.
    pub fn compose(&self, segments: &[LightCurveSegment], scale: &Scale) -> Result<Composition> {
        let usable: Vec<&LightCurveSegment> = segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| match check_segment(segment, self.params.window) {
                Ok(()) => Some(segment),
                Err(e) => {
                    warn!("Skipping segment {}: {}", i, e);
                    None
                }
            })
            .collect();

        let sections = self.section_count(usable.len());
        if sections == 0 {
            return Err(LightsongError::insufficient(format!(
                "{} usable segments, need at least {}",
                usable.len(),
                self.params.max_segment_offset() + 1
            )));
        }

        let transposed: Vec<Scale> = self
            .params
            .passes
            .iter()
            .map(|pass| scale.transposed(pass.transpose))
            .collect();

        let mut composition = Composition::new();
        for section in 0..sections {
            let time_offset = section as f64 * self.params.duration;
            for (pass, pass_scale) in self.params.passes.iter().zip(&transposed) {
                let segment = usable[section + pass.segment_offset];
                compose_voice(
                    segment,
                    pass_scale,
                    pass,
                    time_offset,
                    &self.params,
                    &mut composition,
                )?;
            }
        }
        composition.duration = sections as f64 * self.params.duration;

        debug!(
            "Composed {} sections x {} passes: {} instruments, {} notes",
            sections,
            self.params.passes.len(),
            composition.instruments.len(),
            composition.note_count()
        );

        Ok(composition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::params::Pass;
    use crate::types::ScaleName;

    fn wavy_segment(seed: usize, len: usize) -> LightCurveSegment {
        let time: Vec<f64> = (0..len).map(|i| i as f64 * 0.1).collect();
        let flux: Vec<f64> = (0..len)
            .map(|i| {
                let x = i as f64;
                1e4 + 30.0 * (x / (11.0 + seed as f64)).sin() + 5.0 * (x / 3.0).cos()
                    - if i % 50 == 25 { 200.0 } else { 0.0 }
            })
            .collect();
        LightCurveSegment::new(time, flux).unwrap()
    }

    #[test]
    fn test_counts_and_duration() {
        let segments: Vec<_> = (0..6).map(|s| wavy_segment(s, 400)).collect();
        let orchestrator = CompositionOrchestrator::new(ComposeParams::default()).unwrap();
        let composition = orchestrator
            .compose(&segments, &Scale::from(ScaleName::JazzMinor))
            .unwrap();

        // 4 sections x 3 passes x (melody + percussion)
        assert_eq!(composition.instruments.len(), 24);
        assert_eq!(composition.duration, 360.0);
        assert!(composition.end_time() <= 360.0 + 1e-9);
        assert!(composition.note_count() > 0);
    }

    #[test]
    fn test_sections_limited_by_segments() {
        let segments: Vec<_> = (0..3).map(|s| wavy_segment(s, 200)).collect();
        let orchestrator = CompositionOrchestrator::new(ComposeParams::default()).unwrap();
        let composition = orchestrator
            .compose(&segments, &Scale::from(ScaleName::Blues))
            .unwrap();
        // Second and third passes read one segment ahead, so 2 sections fit.
        assert_eq!(composition.instruments.len(), 2 * 3 * 2);
        assert_eq!(composition.duration, 180.0);
    }

    #[test]
    fn test_passes_layer_within_section() {
        let segments: Vec<_> = (0..2).map(|s| wavy_segment(s, 300)).collect();
        let params = ComposeParams {
            sections: 1,
            passes: vec![
                Pass::new("Cello", "Claves", 0, 2, 36).unwrap(),
                Pass::new("Flute", "Maracas", 12, 1, 60).unwrap(),
            ],
            ..ComposeParams::default()
        };
        let orchestrator = CompositionOrchestrator::new(params).unwrap();
        let composition = orchestrator
            .compose(&segments, &Scale::from(ScaleName::Pentatonic))
            .unwrap();

        assert_eq!(composition.instruments.len(), 4);
        let names: Vec<&str> = composition.instruments.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Cello", "Claves", "Flute", "Maracas"]);
        // Both layers share the one section window rather than following each other.
        for inst in &composition.instruments {
            assert!(inst.notes.iter().all(|n| n.start >= 0.0 && n.end <= 90.0 + 1e-9));
        }
        assert!(composition.instruments[2].notes.iter().any(|n| n.start < 45.0));
    }

    #[test]
    fn test_short_segments_skipped() {
        let mut segments: Vec<_> = (0..3).map(|s| wavy_segment(s, 200)).collect();
        segments.insert(1, LightCurveSegment::new(vec![0.0, 1.0], vec![1.0, 2.0]).unwrap());
        let orchestrator = CompositionOrchestrator::new(ComposeParams::default()).unwrap();
        let composition = orchestrator
            .compose(&segments, &Scale::from(ScaleName::Todi))
            .unwrap();
        assert_eq!(composition.instruments.len(), 12);
    }

    #[test]
    fn test_not_enough_segments() {
        let segments = vec![wavy_segment(0, 200)];
        let orchestrator = CompositionOrchestrator::new(ComposeParams::default()).unwrap();
        let err = orchestrator
            .compose(&segments, &Scale::from(ScaleName::Todi))
            .unwrap_err();
        assert!(matches!(err, LightsongError::InsufficientData { .. }));
    }
}
