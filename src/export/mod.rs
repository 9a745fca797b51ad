//! Export modules for JSON and Standard MIDI files

pub mod json;
pub mod midi;

pub use json::{read_json, write_json};
pub use midi::write_midi;
