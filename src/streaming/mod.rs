//! Real-time audio output
//!
//! The live playback path renders active voices block by block on a producer
//! thread, pushes the samples through a ring buffer and lets a rodio-backed
//! audio device consume them. The producer blocks when the buffer is full
//! (back-pressure), the consumer substitutes silence on underrun.

mod audio_device;
mod realtime;

pub use audio_device::AudioDevice;
pub use realtime::LivePlayer;

use crate::{MmlError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Default output sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Producer back-off while the ring buffer is full, in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 500;

/// Frames mixed per producer iteration
pub const MIX_BLOCK_FRAMES: usize = 512;

/// Streaming configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Number of output channels
    pub channels: u16,
    /// Ring buffer size in frames (determines latency)
    pub ring_buffer_frames: usize,
}

impl StreamConfig {
    /// Low-latency configuration (~100 ms of buffered audio)
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            sample_rate,
            channels: 2,
            ring_buffer_frames: (sample_rate as usize) / 10,
        }
    }

    /// Stutter-resistant configuration (~500 ms of buffered audio)
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            sample_rate,
            channels: 2,
            ring_buffer_frames: (sample_rate as usize) / 2,
        }
    }

    /// Buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.ring_buffer_frames as f32 / self.sample_rate as f32 * 1000.0
    }

    /// Check the configuration for usable values
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::Config`] for a zero sample rate, zero channels or
    /// an empty ring buffer.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(MmlError::Config("sample rate must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(MmlError::Config("channel count must be > 0".to_string()));
        }
        if self.ring_buffer_frames == 0 {
            return Err(MmlError::Config(
                "ring buffer must hold at least one frame".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig::stable(DEFAULT_SAMPLE_RATE)
    }
}

/// Guarded ring state: sample storage plus read cursor and fill level
#[derive(Debug)]
struct RingState {
    data: Vec<f32>,
    read: usize,
    len: usize,
}

/// Ring buffer between the mixing thread and the audio device
///
/// One producer, one consumer. All state sits behind a single parking_lot
/// mutex; both sides copy in contiguous chunks with wrap-around.
#[derive(Debug)]
pub struct RingBuffer {
    state: Mutex<RingState>,
    capacity: usize,
}

impl RingBuffer {
    /// Maximum capacity in samples (512 MB of f32), guards against OOM
    const MAX_CAPACITY: usize = 512 * 1024 * 1024 / std::mem::size_of::<f32>();

    /// Create a ring buffer holding `capacity` samples
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::Config`] for a zero capacity or one above the
    /// safe allocation limit.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MmlError::Config(
                "ring buffer capacity must be greater than 0".to_string(),
            ));
        }
        if capacity > Self::MAX_CAPACITY {
            return Err(MmlError::Config(format!(
                "ring buffer capacity {} exceeds maximum safe size {}",
                capacity,
                Self::MAX_CAPACITY
            )));
        }

        Ok(RingBuffer {
            state: Mutex::new(RingState {
                data: vec![0.0; capacity],
                read: 0,
                len: 0,
            }),
            capacity,
        })
    }

    /// Total capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples available to read without blocking
    pub fn available_read(&self) -> usize {
        self.state.lock().len
    }

    /// Samples that can be written without overflowing
    pub fn available_write(&self) -> usize {
        self.capacity - self.state.lock().len
    }

    /// Write samples; returns how many fit (0 when full)
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut state = self.state.lock();
        let to_write = samples.len().min(self.capacity - state.len);
        if to_write == 0 {
            return 0;
        }

        let write_idx = (state.read + state.len) % self.capacity;
        let first = to_write.min(self.capacity - write_idx);
        state.data[write_idx..write_idx + first].copy_from_slice(&samples[..first]);
        if first < to_write {
            state.data[..to_write - first].copy_from_slice(&samples[first..to_write]);
        }

        state.len += to_write;
        to_write
    }

    /// Read samples; returns how many were available
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let mut state = self.state.lock();
        let to_read = dest.len().min(state.len);
        if to_read == 0 {
            return 0;
        }

        let first = to_read.min(self.capacity - state.read);
        dest[..first].copy_from_slice(&state.data[state.read..state.read + first]);
        if first < to_read {
            dest[first..to_read].copy_from_slice(&state.data[..to_read - first]);
        }

        state.read = (state.read + to_read) % self.capacity;
        state.len -= to_read;
        to_read
    }

    /// Drop all buffered samples
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.read = 0;
        state.len = 0;
    }

    /// Fill level from 0.0 (empty) to 1.0 (full)
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }
}
