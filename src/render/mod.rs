//! Offline rendering
//!
//! Replays the same scheduling and sample-resolution logic as live playback
//! against a fixed-length buffer instead of the audio device. The output is
//! sized to the longest track plus a small trailing pad so note tails and
//! fade-outs are never truncated. An empty or all-rest score still renders a
//! minimal silent buffer rather than failing.

use crate::mml_parser::Track;
use crate::player::build_voices;
use crate::player::mixer::mix_into;
use crate::player::registry::MasterGain;
use crate::samples::SampleBank;
use crate::{MmlError, Result};
use serde::{Deserialize, Serialize};

/// Trailing pad appended after the last event, in seconds
pub const RENDER_TAIL_SECONDS: f64 = 0.1;

/// Offline render target configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Number of output channels
    pub channels: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

impl RenderConfig {
    /// Check the configuration for usable values
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::Config`] for a zero sample rate or zero channels.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(MmlError::Config("sample rate must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(MmlError::Config("channel count must be > 0".to_string()));
        }
        Ok(())
    }
}

/// A completed offline render: interleaved float samples plus their layout
#[derive(Debug, Clone)]
pub struct RenderedAudio {
    /// Sample rate the buffer was rendered at
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Interleaved samples, `channels` values per frame
    pub samples: Vec<f32>,
}

impl RenderedAudio {
    /// Number of frames in the buffer
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Buffer duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Render parsed tracks to a fixed-length interleaved buffer
///
/// Buffer-backed voices are used where the bank resolves a sample, sine
/// synthesis everywhere else, exactly as in live playback.
///
/// # Errors
///
/// Returns [`MmlError::Config`] for an invalid configuration and the
/// scheduler's [`MmlError::Range`] for invalid events. Missing samples never
/// fail a render.
pub fn render_tracks(
    tracks: &[Track],
    bank: &SampleBank,
    config: &RenderConfig,
) -> Result<RenderedAudio> {
    config.validate()?;

    let voices = build_voices(tracks, bank, 0.0)?;

    // Longest cumulative track duration, rests included
    let longest_seconds = tracks
        .iter()
        .map(|t| t.total_duration_ms() / 1000.0)
        .fold(0.0, f64::max);

    let total_seconds = longest_seconds + RENDER_TAIL_SECONDS;
    let frames = ((total_seconds * f64::from(config.sample_rate)).ceil() as usize).max(1);

    let mut samples = vec![0.0f32; frames * usize::from(config.channels)];
    mix_into(
        &mut samples,
        config.channels,
        config.sample_rate,
        0,
        &voices,
        &MasterGain::new(),
    );

    Ok(RenderedAudio {
        sample_rate: config.sample_rate,
        channels: config.channels,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mml_parser::parse_mml;
    use crate::samples::DecodedBuffer;

    #[test]
    fn test_render_length_covers_longest_track_plus_pad() {
        // Two staffs: 4 quarters (2.0 s) vs 2 quarters (1.0 s) at T120
        let tracks = parse_mml("MML@ T120 cdef, T120 ce;", "piano").unwrap();
        let config = RenderConfig {
            sample_rate: 1000,
            channels: 1,
        };
        let rendered = render_tracks(&tracks, &SampleBank::new(), &config).unwrap();

        assert_eq!(rendered.frames(), 2100, "2.0 s + 0.1 s pad at 1 kHz");
    }

    #[test]
    fn test_render_produces_signal() {
        let tracks = parse_mml("MML@ T120 o4 a;", "piano").unwrap();
        let config = RenderConfig {
            sample_rate: 8000,
            channels: 1,
        };
        let rendered = render_tracks(&tracks, &SampleBank::new(), &config).unwrap();

        let peak = rendered
            .samples
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.1, "sine fallback must be audible, peak {}", peak);
    }

    #[test]
    fn test_empty_score_renders_minimal_silence() {
        let rendered =
            render_tracks(&[], &SampleBank::new(), &RenderConfig::default()).unwrap();
        assert!(rendered.frames() > 0);
        assert!(rendered.samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_all_rest_score_renders_silence() {
        let tracks = parse_mml("MML@ r r r;", "piano").unwrap();
        let config = RenderConfig {
            sample_rate: 1000,
            channels: 2,
        };
        let rendered = render_tracks(&tracks, &SampleBank::new(), &config).unwrap();

        assert_eq!(rendered.frames(), 1600, "three quarter rests plus pad");
        assert!(rendered.samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_sampled_render_uses_buffer() {
        let mut bank = SampleBank::new();
        bank.store(
            "piano",
            440.0,
            DecodedBuffer {
                sample_rate: 8000,
                channels: vec![vec![0.5; 16_000]],
            },
        );
        let tracks = parse_mml("MML@ T120 o4 a;", "piano").unwrap();
        let config = RenderConfig {
            sample_rate: 8000,
            channels: 1,
        };
        let rendered = render_tracks(&tracks, &bank, &config).unwrap();

        // Sustain region reads the constant buffer level scaled by the
        // perceptual gain for the default volume 12/15, not a sine
        let expected = 0.5 * crate::player::envelope::volume_to_gain(0.8) as f32;
        let mid = rendered.samples[rendered.frames() / 3];
        assert!((mid - expected).abs() < 0.01, "expected {}, got {}", expected, mid);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = RenderConfig {
            sample_rate: 0,
            channels: 1,
        };
        assert!(matches!(
            render_tracks(&[], &SampleBank::new(), &bad),
            Err(MmlError::Config(_))
        ));
    }
}
