//! MML score parser
//!
//! MML ("Music Macro Language") is a compact text notation for melodies.
//! A score is a single string of the form `MML@ <body> ;` where the body is
//! split on commas into staffs that play simultaneously.
//!
//! Format details:
//! - `T<n>`: tempo in BPM, clamped to [40, 200] (default 120)
//! - `O<n>`: octave, clamped to [1, 7] (default 4)
//! - `V<n>`: volume, clamped to [0, 15] (default 12)
//! - `L<n>`: default note length, clamped to [1, 64] (default 4 = quarter)
//! - `>` / `<`: octave up / down by one, clamped to [1, 7]
//! - `A`-`G` with optional `+`/`#` (sharp) or `-` (flat), optional length
//!   digits and optional `.` (dotted, x1.5): a note
//! - `R` with optional length digits and `.`: a rest
//! - Anything else (including whitespace) is skipped without error
//!
//! Letter case in the body is not meaningful; the whole body is upper-cased
//! before tokenizing. Numeric note shorthand (`N<n>`) is not supported and
//! tokenizes as skipped characters.

use crate::{MmlError, Result};
use serde::Serialize;
use std::iter::Peekable;
use std::str::Chars;

/// Sentinel pitch used for rest events; rests advance time but never sound
pub const REST_PITCH: &str = "REST";

/// Tempo range in BPM
const TEMPO_MIN: u32 = 40;
/// Tempo range in BPM
const TEMPO_MAX: u32 = 200;
/// Octave range
const OCTAVE_MIN: u32 = 1;
/// Octave range
const OCTAVE_MAX: u32 = 7;
/// Volume range (raw MML units, normalized to [0, 1] on emission)
const VOLUME_MAX: u32 = 15;
/// Note length range (1 = whole note, 4 = quarter, ...)
const LENGTH_MIN: u32 = 1;
/// Note length range
const LENGTH_MAX: u32 = 64;

/// One parsed note or rest, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    /// Instrument the event plays on (as passed to [`parse_mml`])
    pub instrument: String,
    /// Pitch name such as `"C#4"`, or [`REST_PITCH`] for rests
    pub pitch: String,
    /// Event duration in milliseconds, always finite and > 0
    pub duration_ms: f64,
    /// Normalized volume in [0, 1]
    pub volume: f64,
}

impl NoteEvent {
    /// Whether this event is a rest (consumes time, produces no voice)
    pub fn is_rest(&self) -> bool {
        self.pitch == REST_PITCH
    }
}

/// Ordered note events of one staff
///
/// Tracks produced from one score share a common start time but advance
/// independently afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Track {
    /// Events in playback order, rests included
    pub events: Vec<NoteEvent>,
}

impl Track {
    /// Sum of all event durations, rests included
    pub fn total_duration_ms(&self) -> f64 {
        self.events.iter().map(|e| e.duration_ms).sum()
    }

    /// Whether the track holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Running per-staff parser state; directives persist until reassigned
struct StaffState {
    tempo: u32,
    octave: u32,
    volume: u32,
    length: u32,
}

impl Default for StaffState {
    fn default() -> Self {
        StaffState {
            tempo: 120,
            octave: 4,
            volume: 12,
            length: 4,
        }
    }
}

/// Parse an MML score into one [`Track`] per non-empty staff
///
/// A whitespace-only score yields an empty track list. Any other input must
/// carry the `MML@` prefix (case-insensitive) and the `;` suffix.
///
/// # Errors
///
/// Returns [`MmlError::Format`] when either delimiter is missing. Unknown
/// characters inside the body are skipped, never rejected.
///
/// # Example
///
/// ```
/// use mmlplay::parse_mml;
/// let tracks = parse_mml("MML@ T96 cdef, O3 V10 g4e4c4;", "piano").unwrap();
/// assert_eq!(tracks.len(), 2);
/// ```
pub fn parse_mml(score: &str, instrument: &str) -> Result<Vec<Track>> {
    let trimmed = score.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let prefix_ok = trimmed
        .get(..4)
        .map(|p| p.eq_ignore_ascii_case("MML@"))
        .unwrap_or(false);
    if !prefix_ok {
        return Err(MmlError::Format(
            "MML score must start with \"MML@\"".to_string(),
        ));
    }
    if !trimmed.ends_with(';') {
        return Err(MmlError::Format(
            "MML score must end with \";\"".to_string(),
        ));
    }

    let body = trimmed[4..trimmed.len() - 1].to_ascii_uppercase();

    let mut tracks = Vec::new();
    for staff in body.split(',') {
        if staff.trim().is_empty() {
            continue;
        }
        tracks.push(parse_staff(staff, instrument));
    }

    Ok(tracks)
}

/// Tokenize one staff left to right with its own running state
fn parse_staff(staff: &str, instrument: &str) -> Track {
    let mut state = StaffState::default();
    let mut events = Vec::new();
    let mut chars = staff.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            'T' => {
                if let Some(n) = read_number(&mut chars) {
                    state.tempo = n.clamp(TEMPO_MIN, TEMPO_MAX);
                }
            }
            'O' => {
                if let Some(n) = read_number(&mut chars) {
                    state.octave = n.clamp(OCTAVE_MIN, OCTAVE_MAX);
                }
            }
            'V' => {
                if let Some(n) = read_number(&mut chars) {
                    state.volume = n.min(VOLUME_MAX);
                }
            }
            'L' => {
                if let Some(n) = read_number(&mut chars) {
                    state.length = n.clamp(LENGTH_MIN, LENGTH_MAX);
                }
            }
            '>' => state.octave = (state.octave + 1).min(OCTAVE_MAX),
            '<' => state.octave = (state.octave - 1).max(OCTAVE_MIN),
            'A'..='G' => {
                let accidental = match chars.peek() {
                    Some('+') | Some('#') => {
                        let a = *chars.peek().unwrap();
                        chars.next();
                        Some(a)
                    }
                    Some('-') => {
                        chars.next();
                        Some('-')
                    }
                    _ => None,
                };
                let duration_ms = read_duration_ms(&mut chars, &state);
                let mut pitch = String::new();
                pitch.push(c);
                if let Some(a) = accidental {
                    pitch.push(a);
                }
                pitch.push_str(&state.octave.to_string());
                events.push(NoteEvent {
                    instrument: instrument.to_string(),
                    pitch,
                    duration_ms,
                    volume: f64::from(state.volume) / f64::from(VOLUME_MAX),
                });
            }
            'R' => {
                let duration_ms = read_duration_ms(&mut chars, &state);
                events.push(NoteEvent {
                    instrument: instrument.to_string(),
                    pitch: REST_PITCH.to_string(),
                    duration_ms,
                    volume: 0.0,
                });
            }
            // Permissive tokenizing: whitespace and unknown characters pass
            _ => {}
        }
    }

    Track { events }
}

/// Read the optional length digits and dot following a note or rest letter
/// and compute the event duration in milliseconds
fn read_duration_ms(chars: &mut Peekable<Chars<'_>>, state: &StaffState) -> f64 {
    let length = read_number(chars)
        .map(|n| n.clamp(LENGTH_MIN, LENGTH_MAX))
        .unwrap_or(state.length);

    let dotted = matches!(chars.peek(), Some('.'));
    if dotted {
        chars.next();
    }

    // Quarter-note time at the running tempo, scaled by the note length
    let quarter_ms = 60_000.0 / f64::from(state.tempo);
    let mut duration = quarter_ms * (4.0 / f64::from(length));
    if dotted {
        duration *= 1.5;
    }
    duration
}

/// Consume a run of digits, if any; saturates instead of overflowing
fn read_number(chars: &mut Peekable<Chars<'_>>) -> Option<u32> {
    let mut value: Option<u32> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_staff_scale() {
        let tracks = parse_mml("MML@ T120 O4 V12 L4 cdefgab>c;", "piano").unwrap();
        assert_eq!(tracks.len(), 1);

        let events = &tracks[0].events;
        assert_eq!(events.len(), 8);
        for event in events {
            assert_eq!(event.instrument, "piano");
            // Quarter note at 120 BPM is exactly 500 ms
            assert_relative_eq!(event.duration_ms, 500.0);
            assert_relative_eq!(event.volume, 0.8);
        }
        assert_eq!(events[0].pitch, "C4");
        assert_eq!(events[7].pitch, "C5", "8th pitch is one octave above the first");
    }

    #[test]
    fn test_two_staffs_independent_state() {
        let tracks = parse_mml("MML@ T96 cdef, O3 V10 g4e4c4;", "piano").unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].events.len(), 4);
        assert_eq!(tracks[1].events.len(), 3);

        // First staff runs at T96, second at the default T120
        assert_relative_eq!(tracks[0].events[0].duration_ms, 625.0);
        assert_relative_eq!(tracks[1].events[0].duration_ms, 500.0);
        assert_eq!(tracks[1].events[0].pitch, "G3");
        assert_relative_eq!(tracks[1].events[0].volume, 10.0 / 15.0);
        assert!(tracks[0].total_duration_ms() != tracks[1].total_duration_ms());
    }

    #[test]
    fn test_blank_staffs_dropped() {
        let tracks = parse_mml("MML@ c, , d;", "piano").unwrap();
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn test_whitespace_only_score_is_empty() {
        assert!(parse_mml("", "piano").unwrap().is_empty());
        assert!(parse_mml("   \n\t ", "piano").unwrap().is_empty());
    }

    #[test]
    fn test_missing_delimiters() {
        assert!(matches!(
            parse_mml("T120 cdef;", "piano"),
            Err(MmlError::Format(_))
        ));
        assert!(matches!(
            parse_mml("MML@ cdef", "piano"),
            Err(MmlError::Format(_))
        ));
    }

    #[test]
    fn test_prefix_case_insensitive() {
        let tracks = parse_mml("mml@ cde;", "piano").unwrap();
        assert_eq!(tracks[0].events.len(), 3);
    }

    #[test]
    fn test_rest_events() {
        let tracks = parse_mml("MML@ c r8 d;", "piano").unwrap();
        let events = &tracks[0].events;
        assert_eq!(events.len(), 3);
        assert!(events[1].is_rest());
        assert_relative_eq!(events[1].duration_ms, 250.0);
        assert_relative_eq!(events[1].volume, 0.0);
    }

    #[test]
    fn test_dotted_and_explicit_lengths() {
        let tracks = parse_mml("MML@ T120 c2 d4. e16;", "piano").unwrap();
        let events = &tracks[0].events;
        assert_relative_eq!(events[0].duration_ms, 1000.0);
        assert_relative_eq!(events[1].duration_ms, 750.0);
        assert_relative_eq!(events[2].duration_ms, 125.0);
    }

    #[test]
    fn test_default_length_directive() {
        let tracks = parse_mml("MML@ T120 L8 cd L2 e;", "piano").unwrap();
        let events = &tracks[0].events;
        assert_relative_eq!(events[0].duration_ms, 250.0);
        assert_relative_eq!(events[1].duration_ms, 250.0);
        assert_relative_eq!(events[2].duration_ms, 1000.0);
    }

    #[test]
    fn test_directive_clamping() {
        // Tempo clamps into [40, 200]
        let fast = parse_mml("MML@ T999 c;", "piano").unwrap();
        assert_relative_eq!(fast[0].events[0].duration_ms, 300.0);
        let slow = parse_mml("MML@ T1 c;", "piano").unwrap();
        assert_relative_eq!(slow[0].events[0].duration_ms, 1500.0);

        // Octave clamps into [1, 7]
        let high = parse_mml("MML@ O9 c;", "piano").unwrap();
        assert_eq!(high[0].events[0].pitch, "C7");

        // Volume clamps into [0, 15]
        let loud = parse_mml("MML@ V99 c;", "piano").unwrap();
        assert_relative_eq!(loud[0].events[0].volume, 1.0);

        // Length clamps into [1, 64]
        let long = parse_mml("MML@ c999;", "piano").unwrap();
        assert_relative_eq!(long[0].events[0].duration_ms, 31.25);
    }

    #[test]
    fn test_octave_shift_clamped_at_bounds() {
        let tracks = parse_mml("MML@ O7 > c O1 < d;", "piano").unwrap();
        assert_eq!(tracks[0].events[0].pitch, "C7");
        assert_eq!(tracks[0].events[1].pitch, "D1");
    }

    #[test]
    fn test_accidentals_in_pitch() {
        let tracks = parse_mml("MML@ O4 c+ d- f#;", "piano").unwrap();
        let events = &tracks[0].events;
        assert_eq!(events[0].pitch, "C+4");
        assert_eq!(events[1].pitch, "D-4");
        assert_eq!(events[2].pitch, "F#4");
    }

    #[test]
    fn test_unknown_characters_skipped() {
        let tracks = parse_mml("MML@ c !? x9 d;", "piano").unwrap();
        assert_eq!(tracks[0].events.len(), 2);
    }

    #[test]
    fn test_volume_zero_stays_exactly_zero() {
        let tracks = parse_mml("MML@ V0 c;", "piano").unwrap();
        assert_eq!(tracks[0].events[0].volume, 0.0);
    }

    #[test]
    fn test_directive_without_digits_is_skipped() {
        // A bare "T" changes nothing; the note still uses the default tempo
        let tracks = parse_mml("MML@ T c;", "piano").unwrap();
        assert_relative_eq!(tracks[0].events[0].duration_ms, 500.0);
    }

    #[test]
    fn test_empty_body_yields_no_tracks() {
        assert!(parse_mml("MML@;", "piano").unwrap().is_empty());
        assert!(parse_mml("MML@   ;", "piano").unwrap().is_empty());
    }
}
