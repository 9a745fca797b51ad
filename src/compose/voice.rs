//! One melodic + one percussive instrument from one light-curve segment

use super::params::{ComposeParams, Pass};
use crate::analysis::{
    compress_runs, extract_contour, intervals, pick_onsets, quantize, spike_signal, ToneMap,
};
use crate::error::{LightsongError, Result};
use crate::types::{Composition, Instrument, LightCurveSegment, Note, Scale};
use tracing::{debug, trace};

/// Map segment time onto `[time_offset, time_offset + duration]`
pub fn rescale_time(time: &[f64], duration: f64, time_offset: f64) -> Result<Vec<f64>> {
    let (first, last) = match (time.first(), time.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Err(LightsongError::insufficient("segment has no samples")),
    };
    let span = last - first;
    if !(span > 0.0) {
        return Err(LightsongError::insufficient("segment covers zero time"));
    }

    let scale = duration / span;
    Ok(time
        .iter()
        .map(|t| (t - first) * scale + time_offset)
        .collect())
}

/// Check a segment is long enough for the filter window
pub fn check_segment(segment: &LightCurveSegment, window: usize) -> Result<()> {
    if segment.len() < window {
        return Err(LightsongError::insufficient(format!(
            "segment of {} samples is shorter than the filter window of {}",
            segment.len(),
            window
        )));
    }
    if !(segment.span() > 0.0) {
        return Err(LightsongError::insufficient("segment covers zero time"));
    }
    Ok(())
}

/// Compose one layer of one section and append it to `composition`
///
/// `scale` must already carry the pass transposition. On error nothing is
/// appended; on success exactly two instruments are, melody then percussion.
pub fn compose_voice(
    segment: &LightCurveSegment,
    scale: &Scale,
    pass: &Pass,
    time_offset: f64,
    params: &ComposeParams,
    composition: &mut Composition,
) -> Result<()> {
    check_segment(segment, params.window)?;

    let time = rescale_time(segment.time(), params.duration, time_offset)?;
    let spans = intervals(&time);

    // Melody
    let contour = extract_contour(segment.flux(), params.window)?;
    let symbols = quantize(&contour.values, scale.len(), pass.n_octaves, params.ceiling)?;
    let runs = compress_runs(&spans, &symbols[..spans.len()])?;
    let tones = ToneMap::new(scale, pass.note_min, pass.n_octaves)?;

    let mut melody = Instrument::melodic(pass.lead.as_str());
    for run in &runs {
        if let Some(note) = tones.note_for(run)? {
            melody.notes.push(note);
        }
    }

    // Percussion
    let spikes = spike_signal(segment.flux(), params.window)?;
    let mut drums = Instrument::percussion(pass.drum.as_str());
    for onset in pick_onsets(&spikes.values, &params.peaks) {
        match spans.get(onset) {
            Some(&(start, end)) => drums.notes.push(Note::new(pass.drum_pitch, start, end)),
            None => trace!("Dropping onset at final sample {}", onset),
        }
    }

    debug!(
        "{} / {}: {} runs, {} notes, {} hits at +{:.1}s",
        pass.lead,
        pass.drum,
        runs.len(),
        melody.notes.len(),
        drums.notes.len(),
        time_offset
    );

    composition.instruments.push(melody);
    composition.instruments.push(drums);
    Ok(())
}
