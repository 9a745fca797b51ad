//! Symbol-to-pitch mapping

use crate::error::{LightsongError, Result};
use crate::types::{Note, Run, Scale};

/// Symbol reserved for rests; runs carrying it produce no note
pub const SILENCE_SYMBOL: usize = 0;

/// Lookup table from quantized symbol to MIDI key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneMap {
    pitches: Vec<u8>,
}

impl ToneMap {
    /// `note_min + 12 * octave + offset`, laid out octave by octave
    pub fn new(scale: &Scale, note_min: u8, n_octaves: usize) -> Result<Self> {
        let mut pitches = Vec::with_capacity(scale.len() * n_octaves);
        for octave in 0..n_octaves {
            for &offset in scale.offsets() {
                let pitch = i64::from(note_min) + 12 * octave as i64 + i64::from(offset);
                let pitch = u8::try_from(pitch).ok().filter(|p| *p <= 127).ok_or_else(|| {
                    LightsongError::InvalidInput(format!(
                        "pitch {} (base {}, octave {}, offset {}) is outside the MIDI range",
                        pitch, note_min, octave, offset
                    ))
                })?;
                pitches.push(pitch);
            }
        }
        Ok(Self { pitches })
    }

    /// Number of symbols the table covers
    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn pitch(&self, symbol: usize) -> Option<u8> {
        self.pitches.get(symbol).copied()
    }

    /// Note for one run, or `None` when the run is a rest
    ///
    /// The caller supplies the run already mapped onto the output timeline.
    pub fn note_for(&self, run: &Run) -> Result<Option<Note>> {
        if run.symbol == SILENCE_SYMBOL {
            return Ok(None);
        }
        let pitch = self.pitch(run.symbol).ok_or_else(|| {
            LightsongError::InvalidInput(format!(
                "symbol {} outside tone table of {}",
                run.symbol,
                self.len()
            ))
        })?;
        Ok(Some(Note::new(pitch, run.start, run.end)))
    }
}
