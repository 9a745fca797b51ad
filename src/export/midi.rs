// Standard MIDI File rendering of compositions.
//
// Output is SMF format 1: a tempo track followed by one track per
// instrument. Note times in seconds are converted to ticks at a fixed
// tempo. Percussion plays on channel 10 (index 9); melodic instruments
// take the remaining fifteen channels in order, wrapping if there are more.

use crate::error::{LightsongError, Result};
use crate::gm;
use crate::types::{Composition, Instrument};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::path::Path;
use tracing::{info, warn};

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Fixed tempo: 120 quarter notes per minute.
const TEMPO_MICROSECONDS: u32 = 500_000;

/// Ticks per second at the fixed tempo.
const TICKS_PER_SECOND: f64 =
    TICKS_PER_QUARTER as f64 * 1_000_000.0 / TEMPO_MICROSECONDS as f64;

/// General MIDI percussion channel.
const DRUM_CHANNEL: u8 = 9;

fn seconds_to_ticks(seconds: f64) -> u32 {
    (seconds.max(0.0) * TICKS_PER_SECOND).round() as u32
}

/// Convert a Composition to MIDI and write to a file.
pub fn write_midi(composition: &Composition, path: &Path) -> Result<()> {
    let smf = composition_to_smf(composition);
    let mut buf = Vec::new();
    smf.write(&mut buf).map_err(|e| LightsongError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Failed to encode MIDI: {}", e),
    })?;

    let temp_path = path.with_extension("mid.tmp");
    std::fs::write(&temp_path, &buf).map_err(|e| LightsongError::output_error(path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        LightsongError::output_error(path, e)
    })?;

    info!("Rendered {} tracks to {}", smf.tracks.len(), path.display());
    Ok(())
}

/// Convert a Composition to an in-memory SMF.
fn composition_to_smf(composition: &Composition) -> Smf<'_> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let tempo_track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(TEMPO_MICROSECONDS))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ];
    smf.tracks.push(tempo_track);

    let mut melodic_index = 0u8;
    for instrument in &composition.instruments {
        let channel = if instrument.is_drum {
            DRUM_CHANNEL
        } else {
            // Skip the percussion channel.
            let c = melodic_index % 15;
            melodic_index = melodic_index.wrapping_add(1);
            if c >= DRUM_CHANNEL {
                c + 1
            } else {
                c
            }
        };
        smf.tracks.push(instrument_track(instrument, u4::new(channel)));
    }

    smf
}

/// One instrument as a track of delta-timed events.
fn instrument_track(instrument: &Instrument, channel: u4) -> Track<'_> {
    let mut track: Track<'_> = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(instrument.name.as_bytes())),
    }];

    if !instrument.is_drum {
        let program = gm::program_number(&instrument.name).unwrap_or_else(|| {
            warn!("'{}' is not a General MIDI program, using piano", instrument.name);
            0
        });
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            },
        });
    }

    // (tick, is_note_on, key, velocity); offs sort before ons at equal ticks
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(instrument.notes.len() * 2);
    for note in &instrument.notes {
        let start = seconds_to_ticks(note.start);
        let end = seconds_to_ticks(note.end).max(start + 1);
        events.push((start, true, note.pitch.min(127), note.velocity.min(127)));
        events.push((end, false, note.pitch.min(127), 0));
    }
    events.sort_by_key(|&(tick, on, _, _)| (tick, on));

    let mut last_tick = 0u32;
    for (tick, on, key, vel) in events {
        let message = if on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Note;

    fn composition() -> Composition {
        let mut lead = Instrument::melodic("SynthStrings 1");
        lead.notes.push(Note::new(60, 0.0, 0.5));
        lead.notes.push(Note::new(60, 0.5, 1.0));
        let mut drums = Instrument::percussion("Acoustic Snare");
        drums.notes.push(Note::new(38, 0.25, 0.3));
        let bass = Instrument::melodic("No Such Instrument");
        Composition {
            instruments: vec![lead, drums, bass],
            duration: 1.0,
        }
    }

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(seconds_to_ticks(0.0), 0);
        assert_eq!(seconds_to_ticks(1.0), 960);
        assert_eq!(seconds_to_ticks(0.5), 480);
    }

    #[test]
    fn test_composition_to_smf_basic() {
        let c = composition();
        let smf = composition_to_smf(&c);
        // 1 tempo track + 3 instrument tracks
        assert_eq!(smf.tracks.len(), 4);
        assert_eq!(smf.header.format, Format::Parallel);
    }

    #[test]
    fn test_drums_on_channel_ten() {
        let c = composition();
        let smf = composition_to_smf(&c);
        let channels: Vec<u8> = smf.tracks[2]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { channel, .. } => Some(channel.as_int()),
                _ => None,
            })
            .collect();
        assert!(!channels.is_empty());
        assert!(channels.iter().all(|&c| c == DRUM_CHANNEL));
    }

    #[test]
    fn test_repeated_note_releases_before_restrike() {
        let c = composition();
        let smf = composition_to_smf(&c);
        let messages: Vec<(u32, MidiMessage)> = smf.tracks[1]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { message, .. } => Some((e.delta.as_int(), message)),
                _ => None,
            })
            .collect();
        // program change, on, off, on, off
        assert_eq!(messages.len(), 5);
        assert!(matches!(messages[2].1, MidiMessage::NoteOff { .. }));
        assert!(matches!(messages[3].1, MidiMessage::NoteOn { .. }));
        assert_eq!(messages[3].0, 0);
    }

    #[test]
    fn test_write_and_parse() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("song.mid");
        write_midi(&composition(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let parsed = Smf::parse(&bytes).unwrap();
        assert_eq!(parsed.tracks.len(), 4);
    }
}
