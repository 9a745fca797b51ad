//! lightsong - Sonification of stellar light curves
//!
//! Turns a star's photometric time series into a multi-instrument
//! composition: the slow brightness contour drives quantized melodies and
//! sharp dips (transits) drive percussion hits. Compositions are written
//! as JSON and Standard MIDI files.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `analysis`: Contour extraction, quantization, run compression,
//!   tone mapping and spike detection
//! - `compose`: Voice composition, multi-section orchestration and the
//!   cached `Sonifier` entry point
//! - `source`: Light-curve loading behind the `LightCurveSource` trait
//! - `cache`: Single-flight memoization over pluggable artifact stores
//! - `export`: JSON and MIDI output
//! - `config`: CLI argument parsing and runtime settings
//! - `pipeline`: Parallel batch processing
//!
//! # Example
//!
//! ```no_run
//! use lightsong::compose::{ComposeParams, CompositionOrchestrator};
//! use lightsong::source::{DirectorySource, LightCurveSource, SegmentFilter};
//! use lightsong::types::{Scale, ScaleName};
//!
//! let source = DirectorySource::new("./lightcurves", SegmentFilter::default());
//! let segments = source.load("4912991").expect("Load failed");
//! let orchestrator = CompositionOrchestrator::new(ComposeParams::default()).expect("Bad params");
//! let composition = orchestrator
//!     .compose(&segments, &Scale::from(ScaleName::JazzMinor))
//!     .expect("Composition failed");
//! println!("{} notes over {}s", composition.note_count(), composition.duration);
//! ```

pub mod analysis;
pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod gm;
pub mod pipeline;
pub mod source;
pub mod types;

// Re-export key types at crate root
pub use error::{LightsongError, Result};
pub use types::{Composition, Instrument, LightCurveSegment, Note, Run, Scale, ScaleName};
