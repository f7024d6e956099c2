//! Audio device integration using rodio
//!
//! Plays ring-buffered samples on the system audio device. The device-side
//! source substitutes silence on underrun so the stream stays alive while
//! the producer catches up, and terminates once the finish signal is set.

use super::RingBuffer;
use crate::{MmlError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Batch size for reads from the ring buffer (reduces lock contention)
const READ_BATCH: usize = 4096;

/// Audio source that reads from the ring buffer
struct RingBufferSource {
    ring: Arc<RingBuffer>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    /// Internal batch buffer refilled from the ring
    batch: Vec<f32>,
    batch_pos: usize,
}

impl RingBufferSource {
    fn new(
        ring: Arc<RingBuffer>,
        sample_rate: u32,
        channels: u16,
        finished: Arc<AtomicBool>,
    ) -> Self {
        RingBufferSource {
            ring,
            sample_rate,
            channels,
            finished,
            batch: vec![0.0; READ_BATCH],
            batch_pos: READ_BATCH, // force a refill on the first pull
        }
    }
}

impl Iterator for RingBufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.batch_pos >= self.batch.len() {
            let read = self.ring.read(&mut self.batch);
            if read < self.batch.len() {
                // Underrun: pad the batch with silence to keep the stream alive
                self.batch[read..].fill(0.0);
            }
            self.batch_pos = 0;
        }

        let sample = self.batch[self.batch_pos];
        self.batch_pos += 1;
        Some(sample)
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        let available = self.ring.available_read();
        if available > 0 {
            Some(available)
        } else {
            Some(READ_BATCH)
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        // Unknown upfront; the stream runs until the finish signal
        None
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Create a new audio device and start consuming the ring buffer
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz (typically 44100)
    /// * `channels` - Number of audio channels (1 mono, 2 stereo)
    /// * `ring` - Ring buffer the mixing thread produces into
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::AudioDevice`] when no output device is available
    /// or the sink cannot be created.
    pub fn new(sample_rate: u32, channels: u16, ring: Arc<RingBuffer>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| MmlError::AudioDevice(format!("Failed to create audio stream: {}", e)))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| MmlError::AudioDevice(format!("Failed to create audio sink: {}", e)))?;

        let finished = Arc::new(AtomicBool::new(false));
        let source = RingBufferSource::new(ring, sample_rate, channels, Arc::clone(&finished));
        sink.append(source);

        Ok(AudioDevice {
            _stream: stream,
            sink,
            running: Arc::new(AtomicBool::new(true)),
            finished,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Whether the device is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal that no more samples will be produced
    ///
    /// Lets the playback stream terminate instead of playing silence forever.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Block until the sink has drained
    pub fn wait_for_finish(&self) {
        self.sink.sleep_until_end();
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.pause();
        self.running.store(false, Ordering::Relaxed);
    }
}
