//! Sample bank and nearest-frequency buffer resolution
//!
//! Recorded instrument samples are stored in a two-level mapping: instrument
//! name to a set of (frequency, decoded buffer) entries. Playback queries the
//! bank for a target frequency and receives the closest stored buffer plus
//! the playback-rate multiplier that pitch-shifts it onto the target. A miss
//! is not an error; callers fall back to sine synthesis.
//!
//! Buffers are shared as [`Arc`] snapshots and never mutated after insertion,
//! so the bank may be reloaded while voices created from older snapshots are
//! still playing.

pub mod loader;

use std::collections::HashMap;
use std::sync::Arc;

/// A decoded audio buffer: per-channel float samples at a fixed sample rate
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    /// Source sample rate in Hz
    pub sample_rate: u32,
    /// One `Vec<f32>` per channel, all the same length
    pub channels: Vec<Vec<f32>>,
}

impl DecodedBuffer {
    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn len_frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Buffer duration in seconds at its native sample rate
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len_frames() as f64 / f64::from(self.sample_rate)
    }
}

/// A resolved sample: the chosen buffer and the rate that pitches it onto
/// the requested frequency
#[derive(Debug, Clone)]
pub struct ResolvedSample {
    /// The stored buffer closest in frequency to the request
    pub buffer: Arc<DecodedBuffer>,
    /// Playback-rate multiplier (1.0 for an exact frequency hit)
    pub playback_rate: f64,
}

/// One stored sample slot; `freq_key` is the frequency in centi-Hz so exact
/// matches survive float comparison
#[derive(Debug, Clone)]
struct SampleSlot {
    freq_key: i64,
    frequency: f64,
    buffer: Arc<DecodedBuffer>,
}

/// Two-level sample store: instrument name to frequency-keyed buffers
///
/// Instrument names are trimmed and lower-cased; frequencies are rounded to
/// 2 decimal places. Within one instrument the insertion order of distinct
/// frequencies is preserved, so nearest-match ties resolve to the entry
/// stored first. Re-storing an exact (instrument, frequency) key replaces
/// the previous buffer.
#[derive(Debug, Default)]
pub struct SampleBank {
    instruments: HashMap<String, Vec<SampleSlot>>,
}

/// Round a frequency to 2 decimal places and express it in centi-Hz
fn freq_key(frequency: f64) -> i64 {
    (frequency * 100.0).round() as i64
}

impl SampleBank {
    /// Create an empty bank
    pub fn new() -> Self {
        SampleBank::default()
    }

    /// Insert or replace the buffer stored for `(instrument, frequency)`
    pub fn store(&mut self, instrument: &str, frequency: f64, buffer: DecodedBuffer) {
        let key = freq_key(frequency);
        let slots = self
            .instruments
            .entry(instrument.trim().to_lowercase())
            .or_default();

        let slot = SampleSlot {
            freq_key: key,
            frequency: (frequency * 100.0).round() / 100.0,
            buffer: Arc::new(buffer),
        };

        // Last write wins on an exact frequency key
        if let Some(existing) = slots.iter_mut().find(|s| s.freq_key == key) {
            *existing = slot;
        } else {
            slots.push(slot);
        }
    }

    /// Resolve the best buffer for `target_frequency`
    ///
    /// Returns the exact-frequency buffer with rate 1.0 when one exists,
    /// otherwise the stored buffer with minimal absolute frequency distance
    /// and `rate = target / nearest`. Returns `None` when the instrument has
    /// no entries, or when the computed rate is non-finite or not positive.
    pub fn resolve(&self, instrument: &str, target_frequency: f64) -> Option<ResolvedSample> {
        let slots = self.instruments.get(&instrument.trim().to_lowercase())?;
        if slots.is_empty() {
            return None;
        }

        let target_key = freq_key(target_frequency);
        if let Some(exact) = slots.iter().find(|s| s.freq_key == target_key) {
            return Some(ResolvedSample {
                buffer: Arc::clone(&exact.buffer),
                playback_rate: 1.0,
            });
        }

        // Strict less-than keeps the first-seen entry on distance ties
        let mut nearest = &slots[0];
        let mut best = (nearest.frequency - target_frequency).abs();
        for slot in &slots[1..] {
            let distance = (slot.frequency - target_frequency).abs();
            if distance < best {
                best = distance;
                nearest = slot;
            }
        }

        let playback_rate = target_frequency / nearest.frequency;
        if !playback_rate.is_finite() || playback_rate <= 0.0 {
            return None;
        }

        Some(ResolvedSample {
            buffer: Arc::clone(&nearest.buffer),
            playback_rate,
        })
    }

    /// Number of buffers stored for an instrument
    pub fn sample_count(&self, instrument: &str) -> usize {
        self.instruments
            .get(&instrument.trim().to_lowercase())
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Whether any buffer is stored for the instrument
    pub fn has_instrument(&self, instrument: &str) -> bool {
        self.sample_count(instrument) > 0
    }

    /// Names of all instruments with at least one stored buffer
    pub fn instrument_names(&self) -> Vec<String> {
        self.instruments
            .iter()
            .filter(|(_, slots)| !slots.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn buffer_marked(mark: f32) -> DecodedBuffer {
        DecodedBuffer {
            sample_rate: 44_100,
            channels: vec![vec![mark; 8]],
        }
    }

    #[test]
    fn test_exact_match_rate_one() {
        let mut bank = SampleBank::new();
        bank.store("piano", 440.0, buffer_marked(0.1));

        let resolved = bank.resolve("piano", 440.0).unwrap();
        assert_eq!(resolved.playback_rate, 1.0);
        assert_relative_eq!(resolved.buffer.channels[0][0], 0.1);
    }

    #[test]
    fn test_nearest_match_playback_rate() {
        let mut bank = SampleBank::new();
        bank.store("piano", 440.0, buffer_marked(0.1));
        bank.store("piano", 880.0, buffer_marked(0.2));

        // 500 Hz is closer to 440 than to 880
        let resolved = bank.resolve("piano", 500.0).unwrap();
        assert_relative_eq!(resolved.buffer.channels[0][0], 0.1);
        assert_relative_eq!(resolved.playback_rate, 500.0 / 440.0);
    }

    #[test]
    fn test_tie_prefers_first_seen() {
        let mut bank = SampleBank::new();
        bank.store("piano", 400.0, buffer_marked(0.1));
        bank.store("piano", 500.0, buffer_marked(0.2));

        // 450 Hz is equidistant; the first stored entry wins
        let resolved = bank.resolve("piano", 450.0).unwrap();
        assert_relative_eq!(resolved.buffer.channels[0][0], 0.1);
        assert_relative_eq!(resolved.playback_rate, 450.0 / 400.0);
    }

    #[test]
    fn test_no_entries_is_no_match() {
        let bank = SampleBank::new();
        assert!(bank.resolve("piano", 440.0).is_none());
        assert!(!bank.has_instrument("piano"));
    }

    #[test]
    fn test_instrument_name_normalized() {
        let mut bank = SampleBank::new();
        bank.store("  Piano ", 440.0, buffer_marked(0.1));

        assert!(bank.has_instrument("piano"));
        assert!(bank.resolve("PIANO", 440.0).is_some());
        assert_eq!(bank.sample_count("piano"), 1);
    }

    #[test]
    fn test_last_write_wins_on_exact_key() {
        let mut bank = SampleBank::new();
        bank.store("piano", 440.0, buffer_marked(0.1));
        bank.store("piano", 440.004, buffer_marked(0.2)); // rounds to the same key

        assert_eq!(bank.sample_count("piano"), 1);
        let resolved = bank.resolve("piano", 440.0).unwrap();
        assert_relative_eq!(resolved.buffer.channels[0][0], 0.2);
    }

    #[test]
    fn test_buffer_metadata() {
        let buffer = DecodedBuffer {
            sample_rate: 22_050,
            channels: vec![vec![0.0; 22_050], vec![0.0; 22_050]],
        };
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.len_frames(), 22_050);
        assert_relative_eq!(buffer.duration_seconds(), 1.0);
    }
}
