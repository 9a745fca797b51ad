//! Composition assembly
//!
//! `voice` turns one segment into one melodic and one percussive
//! instrument; `orchestrator` lays those out over sections and passes;
//! `sonifier` adds loading and memoization on top.

pub mod orchestrator;
pub mod params;
pub mod sonifier;
pub mod voice;

pub use orchestrator::CompositionOrchestrator;
pub use params::{default_passes, ComposeParams, Pass};
pub use sonifier::Sonifier;
pub use voice::compose_voice;
