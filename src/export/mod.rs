//! WAV encoding
//!
//! Encodes rendered float buffers into the canonical uncompressed WAV
//! container: a 44-byte header (PCM format tag, channel count, sample rate,
//! byte rate, block alignment, 16-bit depth) followed by interleaved 16-bit
//! samples. Input samples are clamped to [-1, 1] before quantization, so the
//! byte layout is exact and reproducible for identical input buffers.

use crate::mml_parser::Track;
use crate::render::{render_tracks, RenderConfig, RenderedAudio};
use crate::samples::SampleBank;
use crate::{MmlError, Result};
use std::io::Cursor;
use std::path::Path;

/// Build the hound spec for 16-bit PCM output
fn wav_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Quantize one float sample to 16-bit PCM
fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Encode interleaved float samples to in-memory WAV bytes
///
/// # Errors
///
/// Returns [`MmlError::AudioFile`] when encoding fails.
///
/// # Example
///
/// ```
/// use mmlplay::encode_wav;
/// let bytes = encode_wav(&[0.0, 0.5, -0.5, 0.0], 44_100, 1).unwrap();
/// assert_eq!(&bytes[0..4], b"RIFF");
/// assert_eq!(bytes.len(), 44 + 4 * 2);
/// ```
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate, channels))
        .map_err(|e| MmlError::AudioFile(format!("Failed to start WAV stream: {}", e)))?;

    for &sample in samples {
        writer
            .write_sample(quantize(sample))
            .map_err(|e| MmlError::AudioFile(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| MmlError::AudioFile(format!("Failed to finalize WAV stream: {}", e)))?;

    Ok(cursor.into_inner())
}

/// Write interleaved float samples to a WAV file on disk
///
/// # Errors
///
/// Returns [`MmlError::AudioFile`] when the file cannot be created or
/// written.
pub fn write_wav_file<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    let mut writer = hound::WavWriter::create(path.as_ref(), wav_spec(sample_rate, channels))
        .map_err(|e| MmlError::AudioFile(format!("Failed to create WAV file: {}", e)))?;

    for &sample in samples {
        writer
            .write_sample(quantize(sample))
            .map_err(|e| MmlError::AudioFile(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| MmlError::AudioFile(format!("Failed to finalize WAV file: {}", e)))?;

    Ok(())
}

/// Render a parsed score and encode it to WAV bytes in one step
///
/// # Errors
///
/// Propagates render errors ([`MmlError::Range`], [`MmlError::Config`]) and
/// encoding errors ([`MmlError::AudioFile`]).
pub fn render_to_wav_bytes(
    tracks: &[Track],
    bank: &SampleBank,
    config: &RenderConfig,
) -> Result<Vec<u8>> {
    let rendered = render_tracks(tracks, bank, config)?;
    encode_rendered(&rendered)
}

/// Encode an already rendered buffer to WAV bytes
pub fn encode_rendered(rendered: &RenderedAudio) -> Result<Vec<u8>> {
    encode_wav(&rendered.samples, rendered.sample_rate, rendered.channels)
}
