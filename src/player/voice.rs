//! Playback voices
//!
//! A voice is one live sound-producing unit: either a recorded buffer played
//! back with a pitch-correcting rate multiplier, or a synthesized sine tone,
//! wrapped in its gain envelope. Voices are shared between the registry and
//! the mixing thread, so the envelope sits behind a mutex and disposal is an
//! idempotent atomic flag.

use super::envelope::GainEnvelope;
use crate::samples::DecodedBuffer;
use parking_lot::Mutex;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Signal generator backing a voice
#[derive(Debug, Clone)]
pub enum VoiceSource {
    /// Recorded buffer resampled by `playback_rate` (1.0 = recorded pitch)
    Buffer {
        /// Shared decoded sample data
        buffer: Arc<DecodedBuffer>,
        /// Rate multiplier that pitch-shifts the buffer onto the target
        playback_rate: f64,
    },
    /// Sine synthesizer fallback when no sample resolves
    Sine {
        /// Tone frequency in Hz
        frequency: f64,
    },
}

impl VoiceSource {
    /// Pre-gain sample value `elapsed` seconds into the voice
    ///
    /// Buffers are resampled with linear interpolation; a buffer with fewer
    /// channels than the output maps its last channel onto the remainder,
    /// and playback past the buffer end yields silence.
    pub fn sample_at(&self, elapsed: f64, channel: usize) -> f32 {
        if elapsed < 0.0 {
            return 0.0;
        }
        match self {
            VoiceSource::Sine { frequency } => (TAU * frequency * elapsed).sin() as f32,
            VoiceSource::Buffer {
                buffer,
                playback_rate,
            } => {
                let data = match buffer.channels.get(channel.min(buffer.channel_count().saturating_sub(1))) {
                    Some(data) => data,
                    None => return 0.0,
                };
                let position = elapsed * playback_rate * f64::from(buffer.sample_rate);
                let index = position.floor() as usize;
                if index + 1 >= data.len() {
                    return 0.0;
                }
                let frac = (position - position.floor()) as f32;
                data[index] * (1.0 - frac) + data[index + 1] * frac
            }
        }
    }
}

/// One active playback unit: source generator plus gain envelope
///
/// Owned by the [`VoiceRegistry`](super::registry::VoiceRegistry) until
/// disposal; the mixer reads it concurrently through `Arc` clones.
#[derive(Debug)]
pub struct Voice {
    source: VoiceSource,
    envelope: Mutex<GainEnvelope>,
    start: f64,
    disposed: AtomicBool,
}

impl Voice {
    /// Create a voice; its start time is taken from the envelope
    pub fn new(source: VoiceSource, envelope: GainEnvelope) -> Self {
        let start = envelope.start_time();
        Voice {
            source,
            envelope: Mutex::new(envelope),
            start,
            disposed: AtomicBool::new(false),
        }
    }

    /// The signal generator backing this voice
    pub fn source(&self) -> &VoiceSource {
        &self.source
    }

    /// Absolute start time in seconds
    pub fn start_time(&self) -> f64 {
        self.start
    }

    /// Time the voice reaches silence (envelope end, cut-offs included)
    pub fn end_time(&self) -> f64 {
        self.envelope.lock().end_time()
    }

    /// Copy of the current envelope, for lock-free per-block evaluation
    pub fn envelope_snapshot(&self) -> GainEnvelope {
        self.envelope.lock().clone()
    }

    /// Cancel pending envelope automation and fade to silence
    pub fn cut_off(&self, now: f64, fade: f64) {
        self.envelope.lock().cut_off(now, fade);
    }

    /// Whether playback has ended naturally (or by cut-off) at `now`
    pub fn finished(&self, now: f64) -> bool {
        self.envelope.lock().is_finished(now)
    }

    /// Mark the voice disposed; returns `true` only for the call that
    /// actually disposed it (second and later calls are no-ops)
    pub fn dispose(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    /// Whether the voice has been disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
