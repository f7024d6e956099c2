//! mmlplay command-line interface
//!
//! Renders MML scores to WAV files, dumps parsed tracks as JSON, and (with
//! the `streaming` feature) plays scores on the system audio device.

use anyhow::{bail, Context};
use mmlplay::{parse_mml, render_to_wav_bytes, RenderConfig, SampleBank};
use std::env;
use std::fs;

const USAGE: &str = "\
Usage: mmlplay <command> [options]

Commands:
  render <score> -o <out.wav>   Render a score offline to a WAV file
  dump <score>                  Print parsed tracks as JSON
  play <score>                  Play a score on the audio device (streaming feature)

Options:
  -i <name>      Instrument name used for bank lookups (default: \"default\")
  -r <rate>      Output sample rate in Hz (default: 44100)
  -c <channels>  Output channel count (default: 2)

<score> is either an MML string (\"MML@ ... ;\") or a path to a file
containing one.";

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    match command.as_str() {
        "render" => render_command(rest),
        "dump" => dump_command(rest),
        "play" => play_command(rest),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

/// Parsed common options shared by all commands
struct Options {
    score: String,
    instrument: String,
    output: Option<String>,
    sample_rate: u32,
    channels: u16,
}

fn parse_options(args: &[String]) -> anyhow::Result<Options> {
    let mut score = None;
    let mut instrument = "default".to_string();
    let mut output = None;
    let mut sample_rate = 44_100u32;
    let mut channels = 2u16;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" => {
                output = Some(
                    iter.next()
                        .context("-o requires an output path")?
                        .to_string(),
                )
            }
            "-i" => {
                instrument = iter
                    .next()
                    .context("-i requires an instrument name")?
                    .to_string()
            }
            "-r" => {
                sample_rate = iter
                    .next()
                    .context("-r requires a sample rate")?
                    .parse()
                    .context("invalid sample rate")?
            }
            "-c" => {
                channels = iter
                    .next()
                    .context("-c requires a channel count")?
                    .parse()
                    .context("invalid channel count")?
            }
            other if score.is_none() => score = Some(other.to_string()),
            other => bail!("Unexpected argument '{}'", other),
        }
    }

    let score = score.context("missing <score> argument")?;
    Ok(Options {
        score: resolve_score(&score)?,
        instrument,
        output,
        sample_rate,
        channels,
    })
}

/// Treat the argument as a file path when one exists, otherwise as an
/// inline MML string
fn resolve_score(arg: &str) -> anyhow::Result<String> {
    if std::path::Path::new(arg).is_file() {
        fs::read_to_string(arg).with_context(|| format!("Failed to read score file '{}'", arg))
    } else {
        Ok(arg.to_string())
    }
}

fn render_command(args: &[String]) -> anyhow::Result<()> {
    let options = parse_options(args)?;
    let output = options
        .output
        .context("render requires -o <out.wav>")?;

    let tracks = parse_mml(&options.score, &options.instrument)?;
    let config = RenderConfig {
        sample_rate: options.sample_rate,
        channels: options.channels,
    };

    println!(
        "Rendering {} track(s) at {} Hz, {} channel(s)...",
        tracks.len(),
        config.sample_rate,
        config.channels
    );

    let bank = SampleBank::new();
    let bytes = render_to_wav_bytes(&tracks, &bank, &config)?;
    fs::write(&output, &bytes)
        .with_context(|| format!("Failed to write '{}'", output))?;

    println!("Wrote {} bytes to {}", bytes.len(), output);
    Ok(())
}

fn dump_command(args: &[String]) -> anyhow::Result<()> {
    let options = parse_options(args)?;
    let tracks = parse_mml(&options.score, &options.instrument)?;
    println!("{}", serde_json::to_string_pretty(&tracks)?);
    Ok(())
}

#[cfg(not(feature = "streaming"))]
fn play_command(_args: &[String]) -> anyhow::Result<()> {
    bail!(
        "The play command requires the \"streaming\" feature. Rebuild with `--features streaming` to enable playback."
    );
}

#[cfg(feature = "streaming")]
fn play_command(args: &[String]) -> anyhow::Result<()> {
    use mmlplay::streaming::{AudioDevice, LivePlayer, StreamConfig};
    use std::time::Duration;

    let options = parse_options(args)?;

    let mut config = StreamConfig::stable(options.sample_rate);
    config.channels = options.channels;
    println!("Streaming Configuration:");
    println!("  Sample rate: {} Hz", config.sample_rate);
    println!(
        "  Buffer size: {} frames ({:.1}ms latency)",
        config.ring_buffer_frames,
        config.latency_ms()
    );

    let player = LivePlayer::new(config)?;
    player.set_instrument(&options.instrument);
    let _device = AudioDevice::new(config.sample_rate, config.channels, player.ring_buffer())?;
    println!("Audio device initialized - playing to speakers\n");

    player.play_score(&options.score)?;
    while !player.is_stopped() {
        std::thread::sleep(Duration::from_millis(50));
    }
    // Let the buffered tail drain before tearing the device down
    std::thread::sleep(Duration::from_millis(config.latency_ms() as u64));

    println!("Playback complete");
    Ok(())
}
