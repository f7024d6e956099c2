//! Note name to frequency conversion
//!
//! Maps note names such as `"A4"` or `"C#3"` to frequencies in Hz using
//! 12-tone equal temperament referenced to concert pitch A4 = 440 Hz.
//!
//! Accepted syntax:
//! - Letter `A`-`G` (case-insensitive)
//! - Optional accidental: `#`/`+` for sharp, `b`/`-` for flat
//! - Integer octave (A4 is the octave containing concert A)

use crate::{MmlError, Result};

/// Semitone offset of a note letter from C within one octave
fn letter_semitone(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Convert a note name to its frequency in Hz
///
/// The result is rounded to 2 decimal places so that equal pitches compare
/// equal regardless of the accidental spelling used (`"C#4"` == `"Db4"`).
///
/// # Errors
///
/// Returns [`MmlError::Format`] when the string does not match the expected
/// `letter [accidental] octave` pattern, the letter is outside `A`-`G`, or
/// the octave segment is not a valid integer.
///
/// # Example
///
/// ```
/// use mmlplay::note_to_frequency;
/// assert_eq!(note_to_frequency("A4").unwrap(), 440.0);
/// assert_eq!(note_to_frequency("A5").unwrap(), 880.0);
/// ```
pub fn note_to_frequency(note: &str) -> Result<f64> {
    let mut chars = note.chars();
    let letter = chars
        .next()
        .ok_or_else(|| MmlError::Format("empty note name".to_string()))?;
    let offset = letter_semitone(letter).ok_or_else(|| {
        MmlError::Format(format!("invalid note letter '{}' in \"{}\"", letter, note))
    })?;

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') | Some('+') => (1, &rest[1..]),
        Some('b') | Some('-') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str.parse().map_err(|_| {
        MmlError::Format(format!("invalid octave \"{}\" in note \"{}\"", octave_str, note))
    })?;

    // Semitone distance from A4, the 440 Hz reference (C4 is 9 below A4)
    let semitones = offset + accidental + (octave - 4) * 12 - 9;
    let freq = 440.0 * 2.0_f64.powf(f64::from(semitones) / 12.0);

    Ok((freq * 100.0).round() / 100.0)
}
