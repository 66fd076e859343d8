use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "melody", version, about = "Plays queued tone melodies on an audio output.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Play a melody, one tone at a time.
    #[command(alias = "p")]
    Play(PlayArgs),
    /// Convert a text melody to the packed binary form.
    #[command(alias = "e")]
    Encode(EncodeArgs),
}

#[derive(clap::Args)]
pub struct PlayArgs {
    /// Melody file, `frequency;duration_ms` per line (or packed with --binary).
    pub melody: PathBuf,

    /// JSON config file with defaults for the options below.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where tones go.
    #[arg(short, long, value_enum)]
    pub emitter: Option<EmitterKind>,

    /// Output device name, or `default`.
    #[arg(short, long)]
    pub output_device: Option<String>,

    /// Output gain, 0 to 1.
    #[arg(short, long)]
    pub gain: Option<f32>,

    /// Close right away, dropping whatever hasn't played yet.
    #[arg(long)]
    pub no_wait: bool,

    /// The melody file is already packed tones.
    #[arg(short, long)]
    pub binary: bool,
}

#[derive(clap::Args)]
pub struct EncodeArgs {
    /// Text melody to read.
    pub melody: PathBuf,
    /// Where to write the packed tones.
    pub output: PathBuf,
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmitterKind {
    /// Sound card output.
    Speaker,
    /// Log tones without playing them.
    Log,
}
