//! Playback engine
//!
//! Scheduling, gain envelopes, voices, the voice registry and the block
//! mixer. [`build_voices`] is the shared activation path: the offline
//! renderer and the realtime stream both feed it the parser's tracks and mix
//! whatever it returns.

pub mod envelope;
pub mod mixer;
pub mod registry;
pub mod scheduler;
pub mod voice;

use crate::mml_parser::Track;
use crate::pitch::note_to_frequency;
use crate::samples::SampleBank;
use crate::Result;
use envelope::{volume_to_gain, GainEnvelope};
use std::sync::Arc;
use voice::{Voice, VoiceSource};

/// Build ready-to-mix voices for parsed tracks
///
/// Schedules every track against the shared `base_time` snapshot, resolves
/// each note against the sample bank (falling back to a sine source when no
/// buffer matches — a design branch, not an error) and wraps each voice in
/// its gain envelope. Rests never produce voices.
///
/// # Errors
///
/// Returns [`MmlError::Range`](crate::MmlError::Range) for invalid durations
/// or volumes (before any voice is built) and
/// [`MmlError::Format`](crate::MmlError::Format) for an unparsable pitch.
pub fn build_voices(
    tracks: &[Track],
    bank: &SampleBank,
    base_time: f64,
) -> Result<Vec<Arc<Voice>>> {
    let schedule = scheduler::schedule_tracks(tracks, base_time)?;

    let mut voices = Vec::new();
    for track in &schedule {
        for note in track {
            let frequency = note_to_frequency(&note.event.pitch)?;
            let source = match bank.resolve(&note.event.instrument, frequency) {
                Some(resolved) => VoiceSource::Buffer {
                    buffer: resolved.buffer,
                    playback_rate: resolved.playback_rate,
                },
                None => VoiceSource::Sine { frequency },
            };

            let start = note.timing.start_time();
            let stop = start + note.event.duration_ms / 1000.0;
            let gain = volume_to_gain(note.event.volume);
            voices.push(Arc::new(Voice::new(
                source,
                GainEnvelope::new(start, stop, gain),
            )));
        }
    }

    Ok(voices)
}
