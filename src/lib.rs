//! MML score player with sampled-instrument playback
//!
//! Turns a compact MML ("Music Macro Language") score string into precisely
//! timed audio, preferring pre-loaded recorded samples and falling back to a
//! synthesized sine tone when no sample is available. Scores can be played
//! live against the system audio device or rendered offline to a WAV file.
//!
//! # Features
//! - MML tokenizer/parser: staffs, tempo/octave/volume/length directives,
//!   dotted notes and rests
//! - Note-name to frequency conversion (12-TET, A4 = 440 Hz)
//! - Sample bank with nearest-frequency resolution and playback-rate
//!   pitch correction
//! - Glitch-free gain envelopes (fade-in/sustain/fade-out) around every voice
//! - Voice registry with global fade-out stop
//! - Offline rendering to 16-bit PCM WAV
//! - Optional real-time streaming output (`streaming` feature)
//!
//! # Crate feature flags
//! - `parser` (default): MML parsing and pitch conversion (`mml_parser`, `pitch`)
//! - `sampler` (default): Sample bank, resolver and WAV sample loading (`samples`)
//! - `renderer` (default): Scheduling, voices, offline rendering and WAV export
//!   (`player`, `render`, `export`)
//! - `streaming` (opt-in): Real-time audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Parse a score
//! ```
//! use mmlplay::parse_mml;
//! let tracks = parse_mml("MML@ t120 l4 cdefgab>c;", "piano").unwrap();
//! assert_eq!(tracks.len(), 1);
//! assert_eq!(tracks[0].events.len(), 8);
//! ```
//!
//! ## Render to WAV bytes (sine fallback, no samples loaded)
//! ```
//! use mmlplay::{parse_mml, render_to_wav_bytes, RenderConfig, SampleBank};
//! let tracks = parse_mml("MML@ t140 cde;", "piano").unwrap();
//! let bank = SampleBank::new();
//! let wav = render_to_wav_bytes(&tracks, &bank, &RenderConfig::default()).unwrap();
//! assert_eq!(&wav[0..4], b"RIFF");
//! ```
//!
//! ## Live playback
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use mmlplay::streaming::{AudioDevice, LivePlayer, StreamConfig};
//! let cfg = StreamConfig::stable(44_100);
//! let player = LivePlayer::new(cfg).unwrap();
//! let _dev = AudioDevice::new(cfg.sample_rate, cfg.channels, player.ring_buffer()).unwrap();
//! player.play_score("MML@ t120 o4 cdefg;").unwrap();
//! while !player.is_stopped() {
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! # }
//! ```

#![warn(missing_docs)]

// Domain modules (feature-gated for modular use)
#[cfg(feature = "parser")]
pub mod mml_parser; // MML Score Parsing
#[cfg(feature = "parser")]
pub mod pitch; // Note Name to Frequency Conversion

#[cfg(feature = "sampler")]
pub mod samples; // Sample Bank & Loading

#[cfg(feature = "renderer")]
pub mod export; // WAV Encoding
#[cfg(feature = "renderer")]
pub mod player; // Scheduling, Envelopes & Voices
#[cfg(feature = "renderer")]
pub mod render; // Offline Rendering

#[cfg(feature = "streaming")]
pub mod streaming; // Audio Output & Streaming

/// Error types for MML player operations
#[derive(thiserror::Error, Debug)]
pub enum MmlError {
    /// Malformed score or pitch string
    #[error("Format error: {0}")]
    Format(String),

    /// Out-of-range numeric input (non-positive duration, out-of-bounds volume)
    #[error("Range error: {0}")]
    Range(String),

    /// Sample fetch/decode failure
    #[error("Sample load error: {0}")]
    Load(String),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFile(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for MmlError {
    /// Converts a String into `MmlError::Other`.
    ///
    /// Convenience conversion for generic string errors. Prefer the specific
    /// variant constructors (`Format`, `Range`, `Load`, ...) where the error
    /// class is known, so callers can discriminate.
    fn from(msg: String) -> Self {
        MmlError::Other(msg)
    }
}

impl From<&str> for MmlError {
    /// Converts a string slice into `MmlError::Other`.
    ///
    /// See [`From<String>`] for guidance on when to use explicit variant
    /// constructors instead.
    fn from(msg: &str) -> Self {
        MmlError::Other(msg.to_string())
    }
}

/// Result type for MML player operations
pub type Result<T> = std::result::Result<T, MmlError>;

// Public API exports
#[cfg(feature = "parser")]
pub use mml_parser::{parse_mml, NoteEvent, Track, REST_PITCH};
#[cfg(feature = "parser")]
pub use pitch::note_to_frequency;

#[cfg(feature = "sampler")]
pub use samples::loader::{load_note_sample, load_note_samples, SampleLoader, WavLoader};
#[cfg(feature = "sampler")]
pub use samples::{DecodedBuffer, ResolvedSample, SampleBank};

#[cfg(feature = "renderer")]
pub use export::{encode_wav, render_to_wav_bytes, write_wav_file};
#[cfg(feature = "renderer")]
pub use player::build_voices;
#[cfg(feature = "renderer")]
pub use player::envelope::{volume_to_gain, GainEnvelope, FADE_SECONDS};
#[cfg(feature = "renderer")]
pub use player::registry::VoiceRegistry;
#[cfg(feature = "renderer")]
pub use player::scheduler::{schedule_tracks, PlaybackTiming, ScheduledNote};
#[cfg(feature = "renderer")]
pub use player::voice::{Voice, VoiceSource};
#[cfg(feature = "renderer")]
pub use render::{render_tracks, RenderConfig, RenderedAudio};

#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, LivePlayer, RingBuffer, StreamConfig};
