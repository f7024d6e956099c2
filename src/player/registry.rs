//! Voice registry and stop controller
//!
//! Tracks every active voice so a global stop can fade all of them out
//! together, and answers whether anything is still playing. The registry is
//! the single point of mutable shared state between the mixing thread and
//! the control path, so all access goes through parking_lot locks and the
//! atomic disposal flag on each voice.

use super::envelope::FADE_SECONDS;
use super::voice::Voice;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fade applied to the shared output stage by a global stop
#[derive(Debug, Clone, Copy)]
struct MasterFade {
    at: f64,
    fade: f64,
}

/// The shared output gain stage
///
/// Normally fully open (1.0). A global stop ramps it linearly to 0 over the
/// fade window; once the window has passed, the stage reads as a fresh,
/// fully-open gain again so future playback is unaffected by the fade just
/// performed.
#[derive(Debug, Default)]
pub struct MasterGain {
    fade: Mutex<Option<MasterFade>>,
}

impl MasterGain {
    /// Create an open output stage
    pub fn new() -> Self {
        MasterGain::default()
    }

    /// Evaluate the output stage at time `t`
    ///
    /// Reads 1.0 outside a fade window; past the window's end the stage has
    /// been replaced by a fresh, fully-open one.
    pub fn value_at(&self, t: f64) -> f64 {
        if let Some(MasterFade { at, fade }) = *self.fade.lock() {
            if t >= at && t < at + fade {
                return 1.0 - (t - at) / fade;
            }
        }
        1.0
    }

    /// Ramp the stage to 0 starting at `now`
    pub fn fade_out(&self, now: f64, fade: f64) {
        *self.fade.lock() = Some(MasterFade {
            at: now,
            fade: fade.max(f64::MIN_POSITIVE),
        });
    }
}

/// Registry of all active voices, owned by the player instance
///
/// Voices register on activation and are disposed either when their natural
/// playback ends (via [`sweep`](VoiceRegistry::sweep)) or through the global
/// [`stop_all`](VoiceRegistry::stop_all) fade-out. Disposal is idempotent.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: Mutex<Vec<Arc<Voice>>>,
    master: MasterGain,
}

impl VoiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        VoiceRegistry::default()
    }

    /// Track a newly activated voice
    pub fn register(&self, voice: Arc<Voice>) {
        self.voices.lock().push(voice);
    }

    /// Snapshot of the voices the mixer should consider
    pub fn active_voices(&self) -> Vec<Arc<Voice>> {
        self.voices
            .lock()
            .iter()
            .filter(|v| !v.is_disposed())
            .cloned()
            .collect()
    }

    /// Number of registered, not yet disposed voices
    pub fn active_count(&self) -> usize {
        self.voices.lock().iter().filter(|v| !v.is_disposed()).count()
    }

    /// Dispose voices whose playback has ended and drop disposed entries
    ///
    /// Runs on the mixing thread after every block; this is the natural-end
    /// cleanup path.
    pub fn sweep(&self, now: f64) {
        let mut voices = self.voices.lock();
        for voice in voices.iter() {
            if voice.finished(now) {
                voice.dispose();
            }
        }
        voices.retain(|v| !v.is_disposed());
    }

    /// Fade every active voice to silence and fade the shared output stage
    ///
    /// Cancels pending envelope automation per voice, ramps each gain to 0
    /// over the fixed fade window from `now`, and fades the master stage the
    /// same way (it re-opens after the window). Already-finished voices are
    /// silently skipped; calling this again is harmless.
    pub fn stop_all(&self, now: f64) {
        let voices = self.voices.lock();
        for voice in voices.iter() {
            if voice.is_disposed() || voice.finished(now) {
                continue;
            }
            voice.cut_off(now, FADE_SECONDS);
        }
        drop(voices);
        self.master.fade_out(now, FADE_SECONDS);
    }

    /// Whether nothing is playing at `now`
    ///
    /// True when the registry is empty or every registered voice has
    /// finished. (Deliberately stronger than checking only the most recently
    /// registered voice.)
    pub fn is_stopped(&self, now: f64) -> bool {
        self.voices
            .lock()
            .iter()
            .all(|v| v.is_disposed() || v.finished(now))
    }

    /// The shared output gain stage
    pub fn master(&self) -> &MasterGain {
        &self.master
    }
}
