//! Gain envelopes
//!
//! Every voice is wrapped in a linear fade-in / sustain / fade-out gain ramp
//! so that sample playback and synthesized tones start and stop without
//! clicks. The fade window is a fixed constant, clamped so it never exceeds
//! half the note's duration. Volume maps to gain perceptually through a
//! -60 dB..0 dB decibel range rather than linearly.

/// Fade window applied at the start and end of every voice, in seconds
pub const FADE_SECONDS: f64 = 0.010;

/// Bottom of the perceptual volume range in dB; volume 0 is exact silence
const VOLUME_FLOOR_DB: f64 = -60.0;

/// Convert a normalized volume in [0, 1] to a gain multiplier
///
/// 0 maps to exact silence. Values in (0, 1] sweep a -60 dB..0 dB decibel
/// range, giving roughly equal-loudness steps instead of equal-amplitude
/// steps.
///
/// ```
/// use mmlplay::volume_to_gain;
/// assert_eq!(volume_to_gain(0.0), 0.0);
/// assert_eq!(volume_to_gain(1.0), 1.0);
/// ```
pub fn volume_to_gain(volume: f64) -> f64 {
    if volume <= 0.0 {
        return 0.0;
    }
    let db = VOLUME_FLOOR_DB + (0.0 - VOLUME_FLOOR_DB) * volume.min(1.0);
    10.0_f64.powf(db / 20.0)
}

/// Pending cut-off ramp installed by a global stop
#[derive(Debug, Clone, Copy)]
struct CutOff {
    /// Time the ramp starts
    at: f64,
    /// Gain captured at the moment of the cut
    from_gain: f64,
    /// Ramp length in seconds
    fade: f64,
}

/// Piecewise-linear gain ramp around one voice
///
/// The scheduled shape is 0 -> `gain` over the fade window starting at
/// `start`, hold, then `gain` -> 0 over a symmetric window ending exactly at
/// `stop`. A [`cut_off`](GainEnvelope::cut_off) cancels the scheduled shape
/// from its cut point onward and ramps to silence instead.
#[derive(Debug, Clone)]
pub struct GainEnvelope {
    start: f64,
    stop: f64,
    gain: f64,
    fade: f64,
    cut: Option<CutOff>,
}

impl GainEnvelope {
    /// Create the envelope for a voice playing from `start` to `stop`
    ///
    /// The fade window is [`FADE_SECONDS`] clamped to half the duration so
    /// the in- and out-ramps never overlap.
    pub fn new(start: f64, stop: f64, gain: f64) -> Self {
        let duration = (stop - start).max(0.0);
        GainEnvelope {
            start,
            stop: start + duration,
            gain: gain.max(0.0),
            fade: FADE_SECONDS.min(duration / 2.0),
            cut: None,
        }
    }

    /// Time the voice becomes audible
    pub fn start_time(&self) -> f64 {
        self.start
    }

    /// Scheduled stop time (ignores any cut-off)
    pub fn stop_time(&self) -> f64 {
        self.stop
    }

    /// Sustain gain of the envelope
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Evaluate the envelope at time `t`
    pub fn value_at(&self, t: f64) -> f64 {
        if let Some(cut) = self.cut {
            if t >= cut.at {
                if cut.fade <= 0.0 {
                    return 0.0;
                }
                let k = (t - cut.at) / cut.fade;
                return if k >= 1.0 {
                    0.0
                } else {
                    cut.from_gain * (1.0 - k)
                };
            }
        }
        self.scheduled_value(t)
    }

    /// Evaluate the scheduled (pre-cut) shape at time `t`
    fn scheduled_value(&self, t: f64) -> f64 {
        if t < self.start || t >= self.stop {
            return 0.0;
        }
        if self.fade > 0.0 {
            if t < self.start + self.fade {
                return self.gain * (t - self.start) / self.fade;
            }
            if t > self.stop - self.fade {
                return self.gain * (self.stop - t) / self.fade;
            }
        }
        self.gain
    }

    /// Cancel all pending automation and ramp linearly to silence
    ///
    /// The ramp starts at `now` from whatever value the envelope currently
    /// has and reaches 0 after `fade` seconds. Used by the global stop.
    pub fn cut_off(&mut self, now: f64, fade: f64) {
        let from_gain = self.value_at(now);
        self.cut = Some(CutOff {
            at: now,
            from_gain,
            fade: fade.max(0.0),
        });
    }

    /// Time at which the envelope has reached silence for good
    pub fn end_time(&self) -> f64 {
        match self.cut {
            Some(cut) => self.stop.min(cut.at + cut.fade),
            None => self.stop,
        }
    }

    /// Whether the envelope is silent at `now` and will stay silent
    pub fn is_finished(&self, now: f64) -> bool {
        now >= self.end_time()
    }
}
