//! Sample file loading
//!
//! Loads recorded instrument samples from disk and stores them in a
//! [`SampleBank`](super::SampleBank) under the frequency of the note they
//! were recorded at. Loading is split into two explicit operations:
//! [`load_note_sample`] loads one file and surfaces its error, while
//! [`load_note_samples`] loads a batch and captures failures per item so one
//! bad file never aborts the rest. A failed load simply leaves the slot
//! empty; playback falls back to sine synthesis for that pitch.

use super::{DecodedBuffer, SampleBank};
use crate::pitch::note_to_frequency;
use crate::{MmlError, Result};
use std::path::Path;

/// Decodes one audio file into a [`DecodedBuffer`]
///
/// Implementations cover specific container formats; [`WavLoader`] handles
/// WAV via `hound`.
pub trait SampleLoader {
    /// Decode the file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::Load`] when the file cannot be read or decoded.
    fn load(&self, path: &Path) -> Result<DecodedBuffer>;
}

/// Loads WAV files (16-bit integer or 32-bit float PCM)
pub struct WavLoader;

impl SampleLoader for WavLoader {
    fn load(&self, path: &Path) -> Result<DecodedBuffer> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| MmlError::Load(format!("Failed to open '{}': {}", path.display(), e)))?;

        let spec = reader.spec();
        let channel_count = usize::from(spec.channels.max(1));

        // Decode to normalized f32, whatever the container's sample format
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| {
                    MmlError::Load(format!("Failed to decode '{}': {}", path.display(), e))
                })?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| {
                        MmlError::Load(format!("Failed to decode '{}': {}", path.display(), e))
                    })?
            }
        };

        // De-interleave into per-channel sample arrays
        let frames = interleaved.len() / channel_count;
        let mut channels: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(frames))
            .collect();
        for (i, sample) in interleaved.iter().enumerate() {
            channels[i % channel_count].push(*sample);
        }

        Ok(DecodedBuffer {
            sample_rate: spec.sample_rate,
            channels,
        })
    }
}

/// Load one sample file and store it under the frequency of `note`
///
/// # Errors
///
/// Returns [`MmlError::Format`] for an invalid note name and
/// [`MmlError::Load`] when the file cannot be decoded.
pub fn load_note_sample<L: SampleLoader, P: AsRef<Path>>(
    bank: &mut SampleBank,
    loader: &L,
    instrument: &str,
    note: &str,
    path: P,
) -> Result<()> {
    let frequency = note_to_frequency(note)?;
    let buffer = loader.load(path.as_ref())?;
    bank.store(instrument, frequency, buffer);
    Ok(())
}

/// Load a batch of sample files, isolating failures per item
///
/// Returns one `bool` per `(instrument, note, path)` item, `true` when the
/// item was decoded and stored. Failures (bad note name, unreadable or
/// undecodable file) are captured and never abort the remaining items.
pub fn load_note_samples<L: SampleLoader, P: AsRef<Path>>(
    bank: &mut SampleBank,
    loader: &L,
    items: &[(&str, &str, P)],
) -> Vec<bool> {
    items
        .iter()
        .map(|(instrument, note, path)| {
            load_note_sample(bank, loader, instrument, note, path.as_ref()).is_ok()
        })
        .collect()
}
