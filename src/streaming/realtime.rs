//! Live MML playback
//!
//! [`LivePlayer`] owns the sample bank, the voice registry and a producer
//! thread that mixes all active voices block by block into the ring buffer.
//! The playback clock is the producer's render cursor
//! (`frames_rendered / sample_rate`); every `play_score` call snapshots it
//! once so all staffs of that call share a stable start time.

use super::{RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS, MIX_BLOCK_FRAMES};
use crate::mml_parser::parse_mml;
use crate::player::build_voices;
use crate::player::mixer::mix_into;
use crate::player::registry::VoiceRegistry;
use crate::samples::SampleBank;
use crate::Result;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Live MML player against the streaming output
///
/// Create the player, attach an [`AudioDevice`](super::AudioDevice) to its
/// ring buffer, then call [`play_score`](LivePlayer::play_score). The bank
/// may be reloaded at any time, concurrently with playback; voices created
/// from older buffer snapshots keep playing them.
pub struct LivePlayer {
    config: StreamConfig,
    bank: Arc<RwLock<SampleBank>>,
    registry: Arc<VoiceRegistry>,
    ring: Arc<RingBuffer>,
    frames_rendered: Arc<AtomicU64>,
    instrument: Mutex<String>,
    shutdown: Arc<AtomicBool>,
    render_thread: Option<JoinHandle<()>>,
}

impl LivePlayer {
    /// Create a player and start its mixing thread
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::Config`](crate::MmlError::Config) for an invalid
    /// stream configuration.
    pub fn new(config: StreamConfig) -> Result<Self> {
        Self::with_bank(config, SampleBank::new())
    }

    /// Create a player over a pre-populated sample bank
    pub fn with_bank(config: StreamConfig, bank: SampleBank) -> Result<Self> {
        config.validate()?;

        let channels = usize::from(config.channels);
        let ring = Arc::new(RingBuffer::new(config.ring_buffer_frames * channels)?);
        let bank = Arc::new(RwLock::new(bank));
        let registry = Arc::new(VoiceRegistry::new());
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let render_thread = Some(spawn_render_thread(
            config,
            Arc::clone(&ring),
            Arc::clone(&registry),
            Arc::clone(&frames_rendered),
            Arc::clone(&shutdown),
        ));

        Ok(LivePlayer {
            config,
            bank,
            registry,
            ring,
            frames_rendered,
            instrument: Mutex::new("default".to_string()),
            shutdown,
            render_thread,
        })
    }

    /// The stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The ring buffer the audio device should consume
    pub fn ring_buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.ring)
    }

    /// Shared sample bank, for loading samples before or during playback
    pub fn bank(&self) -> Arc<RwLock<SampleBank>> {
        Arc::clone(&self.bank)
    }

    /// Instrument name used for notes of subsequent `play_score` calls
    pub fn set_instrument(&self, instrument: &str) {
        *self.instrument.lock() = instrument.to_string();
    }

    /// Current value of the playback clock in seconds
    ///
    /// This is the producer's render cursor; audible time trails it by up to
    /// the configured buffer latency.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / f64::from(self.config.sample_rate)
    }

    /// Parse a score and schedule all of its staffs for playback
    ///
    /// Takes one clock snapshot for the whole call; staffs start together
    /// and then advance independently. Notes without a matching sample fall
    /// back to sine synthesis silently.
    ///
    /// # Errors
    ///
    /// Returns [`MmlError::Format`](crate::MmlError::Format) for a malformed
    /// score and [`MmlError::Range`](crate::MmlError::Range) for invalid
    /// event values; nothing is scheduled on error.
    pub fn play_score(&self, score: &str) -> Result<()> {
        let instrument = self.instrument.lock().clone();
        let tracks = parse_mml(score, &instrument)?;

        let base_time = self.current_time();
        let voices = {
            let bank = self.bank.read();
            build_voices(&tracks, &bank, base_time)?
        };
        for voice in voices {
            self.registry.register(voice);
        }
        Ok(())
    }

    /// Fade every active voice out over the fixed fade window
    ///
    /// Best-effort: already-finished voices are skipped, and calling this
    /// again (even on an idle player) is harmless.
    pub fn stop(&self) {
        self.registry.stop_all(self.current_time());
    }

    /// Whether all scheduled voices have finished sounding
    pub fn is_stopped(&self) -> bool {
        self.registry.is_stopped(self.current_time())
    }

    /// Number of voices still registered
    pub fn active_voices(&self) -> usize {
        self.registry.active_count()
    }
}

impl Drop for LivePlayer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.render_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Producer loop: mix a block, sweep finished voices, push with back-pressure
fn spawn_render_thread(
    config: StreamConfig,
    ring: Arc<RingBuffer>,
    registry: Arc<VoiceRegistry>,
    frames_rendered: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let channels = usize::from(config.channels);
        let mut block = vec![0.0f32; MIX_BLOCK_FRAMES * channels];

        while !shutdown.load(Ordering::Acquire) {
            let start_frame = frames_rendered.load(Ordering::Acquire);
            let voices = registry.active_voices();

            block.fill(0.0);
            mix_into(
                &mut block,
                config.channels,
                config.sample_rate,
                start_frame,
                &voices,
                registry.master(),
            );

            let block_end =
                (start_frame + MIX_BLOCK_FRAMES as u64) as f64 / f64::from(config.sample_rate);
            registry.sweep(block_end);

            // Blocking write: back off while the consumer catches up
            let mut remaining = &block[..];
            while !remaining.is_empty() && !shutdown.load(Ordering::Acquire) {
                let written = ring.write(remaining);
                if written == 0 {
                    std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
                } else {
                    remaining = &remaining[written..];
                }
            }

            frames_rendered.fetch_add(MIX_BLOCK_FRAMES as u64, Ordering::AcqRel);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::DecodedBuffer;

    fn test_config() -> StreamConfig {
        StreamConfig {
            sample_rate: 8000,
            channels: 1,
            ring_buffer_frames: 2048,
        }
    }

    /// Drain blocks from the player's ring buffer until `predicate` holds
    /// or a generous sample budget runs out
    fn drain_until<F: Fn(&LivePlayer) -> bool>(player: &LivePlayer, predicate: F) -> bool {
        let ring = player.ring_buffer();
        let mut sink = vec![0.0f32; 1024];
        for _ in 0..2000 {
            if predicate(player) {
                return true;
            }
            if ring.read(&mut sink) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        predicate(player)
    }

    #[test]
    fn test_player_creation() {
        let player = LivePlayer::new(test_config()).unwrap();
        assert!(player.is_stopped(), "fresh player has nothing playing");
        assert_eq!(player.active_voices(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.sample_rate = 0;
        assert!(LivePlayer::new(config).is_err());
    }

    #[test]
    fn test_play_score_registers_voices() {
        let player = LivePlayer::new(test_config()).unwrap();
        player.play_score("MML@ T40 c1d1e1;").unwrap();
        assert_eq!(player.active_voices(), 3);
        assert!(!player.is_stopped());
    }

    #[test]
    fn test_malformed_score_schedules_nothing() {
        let player = LivePlayer::new(test_config()).unwrap();
        assert!(player.play_score("T200 cde").is_err());
        assert_eq!(player.active_voices(), 0);
    }

    #[test]
    fn test_playback_produces_audio_and_finishes() {
        let player = LivePlayer::new(test_config()).unwrap();
        player.play_score("MML@ T200 o4 c8;").unwrap();

        // Drain and look for a non-zero sample
        let ring = player.ring_buffer();
        let mut heard_signal = false;
        let mut sink = vec![0.0f32; 512];
        for _ in 0..500 {
            let read = ring.read(&mut sink);
            if sink[..read].iter().any(|s| s.abs() > 0.01) {
                heard_signal = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(heard_signal, "sine fallback must reach the ring buffer");

        assert!(
            drain_until(&player, |p| p.is_stopped()),
            "a short note must finish on its own"
        );
    }

    #[test]
    fn test_stop_fades_out_and_is_idempotent() {
        let player = LivePlayer::new(test_config()).unwrap();
        player.play_score("MML@ T40 c1 d1 e1;").unwrap();
        assert!(!player.is_stopped());

        player.stop();
        player.stop(); // second call is a no-op

        assert!(
            drain_until(&player, |p| p.is_stopped()),
            "stopped voices must fall silent after the fade window"
        );
        assert!(
            drain_until(&player, |p| p.active_voices() == 0),
            "sweep must clear the registry after the fade"
        );
        assert!(player.is_stopped());
    }

    #[test]
    fn test_bank_reload_during_playback() {
        let player = LivePlayer::new(test_config()).unwrap();
        player.play_score("MML@ T40 c1;").unwrap();

        // Concurrent reload must not disturb the running voice
        player.bank().write().store(
            "default",
            440.0,
            DecodedBuffer {
                sample_rate: 8000,
                channels: vec![vec![0.5; 64]],
            },
        );
        assert_eq!(player.active_voices(), 1);
    }
}
