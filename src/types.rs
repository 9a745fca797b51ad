//! Core data types for lightsong
//!
//! These types represent the domain model and flow through the pipeline.

use crate::error::{LightsongError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Musical primitives
// =============================================================================

/// The fixed catalog of scales a composition can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleName {
    Blues,
    JazzMinor,
    Marwa,
    Pentatonic,
    Todi,
}

impl ScaleName {
    /// Every scale, sorted by name
    pub const ALL: [ScaleName; 5] = [
        ScaleName::Blues,
        ScaleName::JazzMinor,
        ScaleName::Marwa,
        ScaleName::Pentatonic,
        ScaleName::Todi,
    ];

    /// Identifier used on the command line and in artifact names
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleName::Blues => "blues",
            ScaleName::JazzMinor => "jazz_minor",
            ScaleName::Marwa => "marwa",
            ScaleName::Pentatonic => "pentatonic",
            ScaleName::Todi => "todi",
        }
    }

    /// Semitone offsets within one octave, ascending
    pub fn offsets(self) -> &'static [i32] {
        match self {
            ScaleName::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleName::JazzMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleName::Marwa => &[0, 1, 4, 6, 9, 11],
            ScaleName::Pentatonic => &[0, 2, 5, 7, 9],
            ScaleName::Todi => &[0, 1, 4, 6, 7, 8, 11],
        }
    }

    /// Sorted scale identifiers (the catalog listing)
    pub fn all() -> Vec<&'static str> {
        Self::ALL.iter().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for ScaleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleName {
    type Err = LightsongError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| LightsongError::UnknownScale { name: s.to_string() })
    }
}

/// Ordered, duplicate-free set of semitone offsets
///
/// Catalog scales stay within one octave (0-11). A transposed copy keeps
/// the same ordering but may reach past 11.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScaleRepr")]
pub struct Scale {
    offsets: Vec<i32>,
}

/// Unchecked wire form of [`Scale`]
#[derive(Deserialize)]
struct ScaleRepr {
    offsets: Vec<i32>,
}

impl TryFrom<ScaleRepr> for Scale {
    type Error = LightsongError;

    /// Stored scales may be transposed, so only ordering is enforced here
    fn try_from(repr: ScaleRepr) -> Result<Self> {
        Scale::check_order(&repr.offsets)?;
        Ok(Self {
            offsets: repr.offsets,
        })
    }
}

impl Scale {
    /// Build a scale from explicit offsets, rejecting unsorted or repeated values
    pub fn new(offsets: Vec<i32>) -> Result<Self> {
        Self::check_order(&offsets)?;
        if offsets.iter().any(|&o| !(0..12).contains(&o)) {
            return Err(LightsongError::InvalidInput(format!(
                "scale offsets must lie within one octave (0-11): {:?}",
                offsets
            )));
        }
        Ok(Self { offsets })
    }

    fn check_order(offsets: &[i32]) -> Result<()> {
        if offsets.is_empty() {
            return Err(LightsongError::InvalidInput(
                "scale must contain at least one tone".to_string(),
            ));
        }
        if offsets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LightsongError::InvalidInput(format!(
                "scale offsets must be strictly ascending: {:?}",
                offsets
            )));
        }
        Ok(())
    }

    /// Copy of this scale shifted up (or down) by `semitones`
    pub fn transposed(&self, semitones: i32) -> Self {
        Self {
            offsets: self.offsets.iter().map(|o| o + semitones).collect(),
        }
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    /// Number of tones per octave
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl From<ScaleName> for Scale {
    fn from(name: ScaleName) -> Self {
        Self {
            offsets: name.offsets().to_vec(),
        }
    }
}

// =============================================================================
// Light curves
// =============================================================================

/// One contiguous stretch of brightness samples for a single object
///
/// Time is strictly increasing and every sample is finite; the loader
/// enforces this before a segment ever reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SegmentRepr")]
pub struct LightCurveSegment {
    time: Vec<f64>,
    flux: Vec<f64>,
}

/// Unchecked wire form of [`LightCurveSegment`]
#[derive(Deserialize)]
struct SegmentRepr {
    time: Vec<f64>,
    flux: Vec<f64>,
}

impl TryFrom<SegmentRepr> for LightCurveSegment {
    type Error = LightsongError;

    fn try_from(repr: SegmentRepr) -> Result<Self> {
        LightCurveSegment::new(repr.time, repr.flux)
    }
}

impl LightCurveSegment {
    /// Validate and wrap paired time/flux arrays
    pub fn new(time: Vec<f64>, flux: Vec<f64>) -> Result<Self> {
        if time.is_empty() {
            return Err(LightCurveSegment::invalid("segment has no samples"));
        }
        if time.len() != flux.len() {
            return Err(LightsongError::InvalidInput(format!(
                "time and flux lengths differ ({} vs {})",
                time.len(),
                flux.len()
            )));
        }
        if time.iter().chain(flux.iter()).any(|v| !v.is_finite()) {
            return Err(LightCurveSegment::invalid("segment contains non-finite samples"));
        }
        if time.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LightCurveSegment::invalid("segment time is not strictly increasing"));
        }
        Ok(Self { time, flux })
    }

    fn invalid(reason: &str) -> LightsongError {
        LightsongError::InvalidInput(reason.to_string())
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Total time covered, last sample minus first
    pub fn span(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

// =============================================================================
// Sonification results
// =============================================================================

/// Maximal stretch of constant quantized symbol, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub start: f64,
    pub end: f64,
    pub symbol: usize,
}

/// Fixed loudness for every emitted note
pub const NOTE_VELOCITY: u8 = 100;

/// A single sounding event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI key number
    pub pitch: u8,
    /// Onset in seconds
    pub start: f64,
    /// Release in seconds
    pub end: f64,
    pub velocity: u8,
}

impl Note {
    pub fn new(pitch: u8, start: f64, end: f64) -> Self {
        Self {
            pitch,
            start,
            end,
            velocity: NOTE_VELOCITY,
        }
    }
}

/// A voice and the notes it plays
///
/// `name` is an opaque voice identifier handed through to whatever
/// renders the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub is_drum: bool,
    pub notes: Vec<Note>,
}

impl Instrument {
    pub fn melodic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_drum: false,
            notes: Vec::new(),
        }
    }

    pub fn percussion(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_drum: true,
            notes: Vec::new(),
        }
    }

    /// Latest note release, or 0 for a silent instrument
    pub fn end_time(&self) -> f64 {
        self.notes.iter().map(|n| n.end).fold(0.0, f64::max)
    }
}

/// Ordered instruments sharing one time origin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub instruments: Vec<Instrument>,
    /// Nominal length in seconds (sections x section duration)
    pub duration: f64,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_count(&self) -> usize {
        self.instruments.iter().map(|i| i.notes.len()).sum()
    }

    /// Latest note release across all instruments
    pub fn end_time(&self) -> f64 {
        self.instruments
            .iter()
            .map(Instrument::end_time)
            .fold(0.0, f64::max)
    }
}
