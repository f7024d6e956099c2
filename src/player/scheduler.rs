//! Note scheduling
//!
//! Walks parsed tracks and computes an absolute start time for every sounding
//! note. Each track restarts its internal clock at a shared base time, so all
//! tracks of one score begin together and then advance independently. Rests
//! advance the cursor but never appear in the output.

use crate::mml_parser::{NoteEvent, Track};
use crate::{MmlError, Result};

/// When a note starts: a shared base time plus a per-track delay
///
/// `base_time` is a single snapshot of the output clock taken once per play
/// call, so all voices of that call share a stable origin. `delay` is always
/// >= 0 and measured from `base_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTiming {
    /// Clock snapshot shared by every track of the play call, in seconds
    pub base_time: f64,
    /// Cumulative duration of all preceding events in the track, in seconds
    pub delay: f64,
}

impl PlaybackTiming {
    /// Absolute start time of the note
    pub fn start_time(&self) -> f64 {
        self.base_time + self.delay
    }
}

/// One sounding note with its computed timing
#[derive(Debug, Clone)]
pub struct ScheduledNote {
    /// The parsed note (never a rest)
    pub event: NoteEvent,
    /// When the note starts
    pub timing: PlaybackTiming,
}

/// Compute per-track schedules against a shared base time
///
/// Every event's duration and volume is validated across all tracks before
/// anything is emitted, so an invalid event fails the whole call without
/// partial scheduling.
///
/// # Errors
///
/// Returns [`MmlError::Range`] when any event has a non-finite or
/// non-positive duration, or a volume outside [0, 1].
pub fn schedule_tracks(tracks: &[Track], base_time: f64) -> Result<Vec<Vec<ScheduledNote>>> {
    // Fail fast: validate everything before the first scheduling output
    for (track_idx, track) in tracks.iter().enumerate() {
        for (event_idx, event) in track.events.iter().enumerate() {
            if !event.duration_ms.is_finite() || event.duration_ms <= 0.0 {
                return Err(MmlError::Range(format!(
                    "event {} of track {} has invalid duration {} ms",
                    event_idx, track_idx, event.duration_ms
                )));
            }
            if !(0.0..=1.0).contains(&event.volume) {
                return Err(MmlError::Range(format!(
                    "event {} of track {} has volume {} outside [0, 1]",
                    event_idx, track_idx, event.volume
                )));
            }
        }
    }

    let mut schedule = Vec::with_capacity(tracks.len());
    for track in tracks {
        let mut notes = Vec::new();
        let mut cursor = 0.0;
        for event in &track.events {
            let delay = cursor;
            cursor += event.duration_ms / 1000.0;
            if event.is_rest() {
                continue;
            }
            notes.push(ScheduledNote {
                event: event.clone(),
                timing: PlaybackTiming { base_time, delay },
            });
        }
        schedule.push(notes);
    }

    Ok(schedule)
}
