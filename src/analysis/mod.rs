//! Light-curve signal analysis
//!
//! Pure array transforms that turn flux into musical material: the melodic
//! path (contour → symbols → runs → notes) and the percussive path
//! (spike signal → onsets).

pub mod contour;
pub mod filter;
pub mod quantize;
pub mod runs;
pub mod spikes;
pub mod tone;

pub use contour::{extract_contour, Contour, DEFAULT_WINDOW};
pub use quantize::{quantize, CeilingPolicy};
pub use runs::{compress_runs, intervals};
pub use spikes::{pick_onsets, spike_signal, PeakPickParams, SpikeSignal};
pub use tone::{ToneMap, SILENCE_SYMBOL};
