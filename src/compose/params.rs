//! Composition parameters and instrument passes

use crate::analysis::contour::DEFAULT_WINDOW;
use crate::analysis::{CeilingPolicy, PeakPickParams};
use crate::error::{LightsongError, Result};
use crate::gm;
use hash32::FnvHasher;
use serde::{Deserialize, Serialize};

/// Default length of one section in seconds
pub const DEFAULT_DURATION: f64 = 90.0;

/// Default number of consecutive sections in a composition
pub const DEFAULT_SECTIONS: usize = 4;

/// One instrument layer, repeated in every section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    /// Melodic voice identifier
    pub lead: String,
    /// Percussion voice identifier
    pub drum: String,
    /// Key number every percussion hit plays
    pub drum_pitch: u8,
    /// Semitones added to the base scale
    pub transpose: i32,
    /// Octaves the melody spans
    pub n_octaves: usize,
    /// Lowest melodic pitch
    pub note_min: u8,
    /// Which segment, relative to the section index, this layer reads
    pub segment_offset: usize,
}

impl Pass {
    /// Layer reading the section's own segment, drum pitch resolved by GM name
    pub fn new(
        lead: impl Into<String>,
        drum: impl Into<String>,
        transpose: i32,
        n_octaves: usize,
        note_min: u8,
    ) -> Result<Self> {
        let drum = drum.into();
        let drum_pitch = gm::drum_key(&drum).ok_or_else(|| {
            LightsongError::ConfigError(format!(
                "'{}' is not a General MIDI percussion name; set drum_pitch explicitly",
                drum
            ))
        })?;
        Ok(Self {
            lead: lead.into(),
            drum,
            drum_pitch,
            transpose,
            n_octaves,
            note_min,
            segment_offset: 0,
        })
    }

    pub fn with_segment_offset(mut self, offset: usize) -> Self {
        self.segment_offset = offset;
        self
    }

    pub fn with_drum_pitch(mut self, pitch: u8) -> Self {
        self.drum_pitch = pitch;
        self
    }
}

/// The standard three-layer arrangement
///
/// A lead guitar over the section's own segment, plus two string layers a
/// fifth and a fourth up that read the following segment.
pub fn default_passes() -> Vec<Pass> {
    vec![
        Pass {
            lead: "Overdriven Guitar".to_string(),
            drum: "Splash Cymbal".to_string(),
            drum_pitch: 55,
            transpose: 0,
            n_octaves: 3,
            note_min: 48,
            segment_offset: 0,
        },
        Pass {
            lead: "SynthStrings 2".to_string(),
            drum: "Bass Drum 1".to_string(),
            drum_pitch: 36,
            transpose: 7,
            n_octaves: 3,
            note_min: 24,
            segment_offset: 1,
        },
        Pass {
            lead: "SynthStrings 1".to_string(),
            drum: "Acoustic Snare".to_string(),
            drum_pitch: 38,
            transpose: 5,
            n_octaves: 2,
            note_min: 36,
            segment_offset: 1,
        },
    ]
}

/// Everything the orchestrator needs besides the light curve and scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeParams {
    /// Median filter width for contour and spike extraction (odd)
    pub window: usize,
    /// Seconds each section lasts
    pub duration: f64,
    /// Maximum number of sections
    pub sections: usize,
    pub passes: Vec<Pass>,
    pub ceiling: CeilingPolicy,
    pub peaks: PeakPickParams,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            duration: DEFAULT_DURATION,
            sections: DEFAULT_SECTIONS,
            passes: default_passes(),
            ceiling: CeilingPolicy::default(),
            peaks: PeakPickParams::default(),
        }
    }
}

impl ComposeParams {
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Reject parameter sets that could never produce a composition
    pub fn validate(&self) -> Result<()> {
        crate::analysis::filter::check_window(self.window)?;
        self.peaks.validate()?;
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(LightsongError::InvalidInput(format!(
                "section duration must be positive, got {}",
                self.duration
            )));
        }
        if self.sections == 0 {
            return Err(LightsongError::InvalidInput(
                "at least one section is required".to_string(),
            ));
        }
        if self.passes.is_empty() {
            return Err(LightsongError::InvalidInput(
                "at least one instrument pass is required".to_string(),
            ));
        }
        for pass in &self.passes {
            if pass.n_octaves == 0 {
                return Err(LightsongError::InvalidInput(format!(
                    "pass '{}' spans zero octaves",
                    pass.lead
                )));
            }
            if pass.drum_pitch > 127 || pass.note_min > 127 {
                return Err(LightsongError::InvalidInput(format!(
                    "pass '{}' uses a pitch outside the MIDI range",
                    pass.lead
                )));
            }
        }
        Ok(())
    }

    /// FNV-1a fingerprint of everything except `duration`
    ///
    /// Two parameter sets that can produce different compositions for the
    /// same star, scale and duration get different fingerprints.
    pub fn fingerprint(&self) -> u32 {
        use hash32::Hasher as Hash32Hasher;
        use std::hash::Hasher;

        let mut hasher = FnvHasher::default();
        hasher.write_u64(self.window as u64);
        hasher.write_u64(self.sections as u64);
        hasher.write_u8(match self.ceiling {
            CeilingPolicy::Wrap => 0,
            CeilingPolicy::Clamp => 1,
        });
        for pass in &self.passes {
            hasher.write(pass.lead.as_bytes());
            hasher.write(&[0]);
            hasher.write(pass.drum.as_bytes());
            hasher.write(&[0]);
            hasher.write_u8(pass.drum_pitch);
            hasher.write_i32(pass.transpose);
            hasher.write_u64(pass.n_octaves as u64);
            hasher.write_u8(pass.note_min);
            hasher.write_u64(pass.segment_offset as u64);
        }
        let peaks = &self.peaks;
        for width in [peaks.pre_max, peaks.post_max, peaks.pre_avg, peaks.post_avg, peaks.wait] {
            hasher.write_u64(width as u64);
        }
        hasher.write_u64(peaks.delta.to_bits());
        hasher.finish32()
    }

    /// Furthest segment any pass reads ahead of its section
    pub fn max_segment_offset(&self) -> usize {
        self.passes
            .iter()
            .map(|p| p.segment_offset)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_passes_use_gm_drums() {
        for pass in default_passes() {
            assert_eq!(gm::drum_key(&pass.drum), Some(pass.drum_pitch), "{}", pass.drum);
            assert!(gm::program_number(&pass.lead).is_some(), "{}", pass.lead);
        }
    }

    #[test]
    fn test_pass_new_resolves_drum() {
        let pass = Pass::new("Cello", "Cowbell", -12, 2, 36).unwrap();
        assert_eq!(pass.drum_pitch, 56);
        assert_eq!(pass.segment_offset, 0);
        assert!(Pass::new("Cello", "Thunder Sheet", 0, 2, 36).is_err());

        let custom = Pass::new("Cello", "Cowbell", 0, 2, 36)
            .unwrap()
            .with_drum_pitch(60)
            .with_segment_offset(2);
        assert_eq!((custom.drum_pitch, custom.segment_offset), (60, 2));
    }

    #[test]
    fn test_validate() {
        let params = ComposeParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.max_segment_offset(), 1);

        assert!(params.clone().with_duration(0.0).validate().is_err());
        assert!(params.clone().with_duration(f64::NAN).validate().is_err());
        assert!(ComposeParams { window: 4, ..params.clone() }.validate().is_err());
        assert!(ComposeParams { sections: 0, ..params.clone() }.validate().is_err());
        assert!(ComposeParams { passes: vec![], ..params.clone() }.validate().is_err());

        let flat_mean = PeakPickParams {
            pre_avg: 0,
            post_avg: 0,
            ..PeakPickParams::default()
        };
        assert!(ComposeParams { peaks: flat_mean, ..params }.validate().is_err());
    }

    #[test]
    fn test_fingerprint_tracks_everything_but_duration() {
        let params = ComposeParams::default();
        let base = params.fingerprint();
        assert_eq!(params.clone().with_duration(30.0).fingerprint(), base);
        assert_eq!(ComposeParams::default().fingerprint(), base);

        assert_ne!(ComposeParams { window: 21, ..params.clone() }.fingerprint(), base);
        assert_ne!(ComposeParams { sections: 2, ..params.clone() }.fingerprint(), base);
        assert_ne!(
            ComposeParams { ceiling: CeilingPolicy::Wrap, ..params.clone() }.fingerprint(),
            base
        );
        let mut passes = default_passes();
        passes[2].transpose = 4;
        assert_ne!(ComposeParams { passes, ..params }.fingerprint(), base);
    }
}
