use std::{fs, path::Path, time::Instant};

use anyhow::Context;
use clap::Parser;
use cpal::traits::StreamTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use args::{Args, Command, EmitterKind, EncodeArgs, PlayArgs};
use config::Config;
use device::{MelodyDevice, IOCTL_MELODY_PLAY, IOCTL_MELODY_WAIT_ON_CLOSE};
use melody::{emitter::LogEmitter, Tone, ToneEmitter};

mod args;
mod audio;
mod config;
mod device;
mod melody;
mod misc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "melody=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Args::parse().command {
        Command::Play(args) => play(args),
        Command::Encode(args) => encode(args),
    }
}

fn play(args: PlayArgs) -> anyhow::Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply(&args)?;

    let data = load_melody(&args.melody, args.binary)?;
    let tones = Tone::decode_all(&data)?;
    let total = tones.iter().map(|x| x.duration as u64).sum::<u64>();
    println!(
        "[*] Loaded {} tones ({:.1}s)",
        tones.len(),
        total as f32 / 1000.0
    );

    match config.emitter {
        EmitterKind::Log => run(LogEmitter::default(), &data, config.wait_on_close),
        EmitterKind::Speaker => {
            let out = audio::devices::output_device(&config.output_device)?;
            println!(
                "[*] Output hooked into `{}` ({})",
                out.name(),
                out.config.sample_rate().0
            );

            let output = audio::output::ToneOutput::new(
                out.config.sample_rate().0,
                out.config.channels(),
                config.gain,
            );
            let stream = audio::output::build_stream(&out.device, &out.config, output.clone())?;
            stream.play().context("Failed to start output stream")?;

            run(
                audio::output::SpeakerEmitter::new(output),
                &data,
                config.wait_on_close,
            )
        }
    }
}

/// One open / submit / close cycle against a freshly loaded device.
fn run(emitter: impl ToneEmitter + 'static, data: &[u8], wait: bool) -> anyhow::Result<()> {
    let device = MelodyDevice::load(emitter);
    device
        .open_session()
        .context("Failed to open playback session")?;

    device.control(IOCTL_MELODY_PLAY, data.len(), Some(data))?;
    device.control(IOCTL_MELODY_WAIT_ON_CLOSE, 1, Some(&[wait as u8]))?;

    let start = Instant::now();
    device.close_session();
    if wait {
        println!("[*] Finished in {:.1}s", start.elapsed().as_secs_f32());
    } else {
        let ctl = device.controller();
        println!(
            "[*] Closed session {} without waiting ({}), {} tones left unplayed",
            ctl.session_id().unwrap_or_default(),
            ctl.worker_state()
                .map_or_else(|| "no worker".to_owned(), |x| x.to_string()),
            ctl.queued()
        );
    }

    device.unload();
    Ok(())
}

fn encode(args: EncodeArgs) -> anyhow::Result<()> {
    let data = load_melody(&args.melody, false)?;
    fs::write(&args.output, &data)
        .with_context(|| format!("Failed to write `{}`", args.output.display()))?;
    println!(
        "[*] Wrote {} tones to `{}`",
        data.len() / Tone::ENCODED_SIZE,
        args.output.display()
    );
    Ok(())
}

/// Reads a melody file into packed tones.
fn load_melody(path: &Path, binary: bool) -> anyhow::Result<Vec<u8>> {
    if binary {
        return fs::read(path).with_context(|| format!("Failed to read `{}`", path.display()));
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read `{}`", path.display()))?;
    let tones = Tone::parse_melody(&text)
        .with_context(|| format!("Failed to parse `{}`", path.display()))?;
    if tones.is_empty() {
        anyhow::bail!("`{}` has no tones", path.display());
    }

    Ok(Tone::encode_all(&tones))
}
