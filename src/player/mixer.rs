//! Block mixing
//!
//! One mixing routine drives both playback paths: the offline renderer calls
//! it once over the whole output range, the realtime stream calls it block by
//! block. Every active voice contributes its resampled or synthesized signal
//! multiplied by its gain envelope and the shared master stage.

use super::registry::MasterGain;
use super::voice::Voice;
use std::sync::Arc;

/// Mix `voices` additively into an interleaved output block
///
/// `out` holds `channels` interleaved samples per frame; the block covers
/// frames `start_frame..start_frame + out.len() / channels` of the output
/// clock. Disposed voices and voices entirely outside the block are skipped.
/// Samples are accumulated without clamping; quantization clamps later.
pub fn mix_into(
    out: &mut [f32],
    channels: u16,
    sample_rate: u32,
    start_frame: u64,
    voices: &[Arc<Voice>],
    master: &MasterGain,
) {
    let channels = usize::from(channels.max(1));
    let frames = out.len() / channels;
    if frames == 0 {
        return;
    }

    let rate = f64::from(sample_rate);
    let block_start = start_frame as f64 / rate;
    let block_end = (start_frame + frames as u64) as f64 / rate;

    for voice in voices {
        if voice.is_disposed() {
            continue;
        }
        let envelope = voice.envelope_snapshot();
        if envelope.end_time() <= block_start || envelope.start_time() >= block_end {
            continue;
        }

        let voice_start = voice.start_time();
        for frame in 0..frames {
            let t = (start_frame + frame as u64) as f64 / rate;
            let gain = envelope.value_at(t) * master.value_at(t);
            if gain <= 0.0 {
                continue;
            }
            let elapsed = t - voice_start;
            for channel in 0..channels {
                out[frame * channels + channel] +=
                    voice.source().sample_at(elapsed, channel) * gain as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::envelope::GainEnvelope;
    use crate::player::voice::VoiceSource;
    use crate::samples::DecodedBuffer;

    fn constant_buffer_voice(value: f32, start: f64, stop: f64) -> Arc<Voice> {
        let buffer = Arc::new(DecodedBuffer {
            sample_rate: 100,
            channels: vec![vec![value; 1000]],
        });
        Arc::new(Voice::new(
            VoiceSource::Buffer {
                buffer,
                playback_rate: 1.0,
            },
            GainEnvelope::new(start, stop, 1.0),
        ))
    }

    #[test]
    fn test_mix_single_voice_sustain_level() {
        let voices = vec![constant_buffer_voice(0.5, 0.0, 1.0)];
        let master = MasterGain::new();

        let mut out = vec![0.0f32; 100];
        mix_into(&mut out, 1, 100, 25, &voices, &master);

        // Frame 50 sits in the sustain region (t = 0.5 s)
        assert!((out[25] - 0.5).abs() < 1e-6, "sustain sample, got {}", out[25]);
    }

    #[test]
    fn test_mix_is_additive() {
        let voices = vec![
            constant_buffer_voice(0.25, 0.0, 1.0),
            constant_buffer_voice(0.25, 0.0, 1.0),
        ];
        let master = MasterGain::new();

        let mut out = vec![0.0f32; 10];
        mix_into(&mut out, 1, 100, 50, &voices, &master);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_disposed_voice_is_skipped() {
        let voice = constant_buffer_voice(0.5, 0.0, 1.0);
        voice.dispose();
        let master = MasterGain::new();

        let mut out = vec![0.0f32; 10];
        mix_into(&mut out, 1, 100, 50, &[voice], &master);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_voice_outside_block_is_silent() {
        let voices = vec![constant_buffer_voice(0.5, 5.0, 6.0)];
        let master = MasterGain::new();

        let mut out = vec![0.0f32; 100];
        mix_into(&mut out, 1, 100, 0, &voices, &master);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_master_fade_silences_block() {
        let voices = vec![constant_buffer_voice(0.5, 0.0, 10.0)];
        let master = MasterGain::new();
        master.fade_out(0.0, 0.01);

        // Block starts after the fade window; the stage re-opened but the
        // voice envelope was not cut, so signal passes at full level again
        let mut out = vec![0.0f32; 4];
        mix_into(&mut out, 1, 100, 100, &voices, &master);
        assert!((out[0] - 0.5).abs() < 1e-6);

        // During the fade window the contribution is attenuated
        let mut during = vec![0.0f32; 1];
        mix_into(&mut during, 1, 1000, 5, &voices, &master);
        assert!(during[0] > 0.0 && during[0] < 0.5);
    }

    #[test]
    fn test_stereo_interleaving() {
        let voices = vec![constant_buffer_voice(0.5, 0.0, 1.0)];
        let master = MasterGain::new();

        let mut out = vec![0.0f32; 20];
        mix_into(&mut out, 2, 100, 50, &voices, &master);
        // Mono buffer feeds both interleaved channels
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }
}
