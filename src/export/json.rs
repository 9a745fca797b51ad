//! JSON export of compositions
//!
//! The same document doubles as the cached artifact, so it carries enough
//! to rebuild the `Composition` exactly.

use crate::cache::CacheKey;
use crate::error::{LightsongError, Result};
use crate::gm;
use crate::types::{Composition, Instrument, Note};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON output structure
#[derive(Debug, Serialize, Deserialize)]
pub struct CompositionJson {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ExportMetadata,
    pub instruments: Vec<InstrumentJson>,
}

/// Export metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// lightsong version that generated this file
    pub generator_version: String,
    /// Timestamp of export
    pub exported_at: String,
    pub star_id: String,
    pub scale: String,
    /// Seconds per section
    pub section_duration: f64,
    /// Seconds for the whole composition
    pub duration: f64,
    pub instrument_count: usize,
    pub note_count: usize,
}

/// JSON representation of one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentJson {
    pub name: String,
    pub is_drum: bool,
    /// General MIDI program, when the name is a standard one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<u8>,
    pub notes: Vec<Note>,
}

impl From<&Instrument> for InstrumentJson {
    fn from(inst: &Instrument) -> Self {
        Self {
            name: inst.name.clone(),
            is_drum: inst.is_drum,
            program: if inst.is_drum {
                None
            } else {
                gm::program_number(&inst.name)
            },
            notes: inst.notes.clone(),
        }
    }
}

impl From<InstrumentJson> for Instrument {
    fn from(json: InstrumentJson) -> Self {
        Self {
            name: json.name,
            is_drum: json.is_drum,
            notes: json.notes,
        }
    }
}

/// Write a composition to a JSON file
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
/// This prevents a half-written artifact from being mistaken for a cached one.
pub fn write_json(composition: &Composition, key: &CacheKey, output_path: &Path) -> Result<()> {
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| LightsongError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let writer = BufWriter::new(file);

    let output = CompositionJson {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            star_id: key.id.clone(),
            scale: key.scale.to_string(),
            section_duration: key.duration,
            duration: composition.duration,
            instrument_count: composition.instruments.len(),
            note_count: composition.note_count(),
        },
        instruments: composition.instruments.iter().map(InstrumentJson::from).collect(),
    };

    serde_json::to_writer_pretty(writer, &output).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        LightsongError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        LightsongError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!(
        "Wrote {} instruments ({} notes) to {}",
        composition.instruments.len(),
        composition.note_count(),
        output_path.display()
    );

    Ok(())
}

/// Read a previously written composition
///
/// Returns `None` if the file doesn't exist or can't be parsed.
pub fn read_json(json_path: &Path) -> Option<Composition> {
    if !json_path.exists() {
        debug!("No existing composition at {}", json_path.display());
        return None;
    }

    let file = match File::open(json_path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Could not open existing composition: {}", e);
            return None;
        }
    };

    let json: CompositionJson = match serde_json::from_reader(BufReader::new(file)) {
        Ok(j) => j,
        Err(e) => {
            debug!("Could not parse existing composition: {}", e);
            return None;
        }
    };

    Some(Composition {
        duration: json.metadata.duration,
        instruments: json.instruments.into_iter().map(Instrument::from).collect(),
    })
}
