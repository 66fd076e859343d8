//! Plays the current tone out of a cpal stream.

use std::sync::Arc;

use anyhow::Context;
use cpal::{
    traits::DeviceTrait, Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig,
};
use parking_lot::Mutex;
use tracing::error;

use super::oscillator::Oscillator;
use crate::melody::{Error, Result, ToneEmitter};

/// Fade in applied whenever a new tone starts, in seconds.
const RAMP: f32 = 5.0 / 1000.0;

/// Shared between the audio callback and the [`SpeakerEmitter`].
pub struct ToneOutput {
    sample_rate: u32,
    channels: u16,
    gain: f32,
    tone: Mutex<Option<Oscillator>>,
}

impl ToneOutput {
    pub fn new(sample_rate: u32, channels: u16, gain: f32) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            channels,
            gain,
            tone: Mutex::new(None),
        })
    }

    /// Fills an interleaved buffer, writing the same sample to every channel.
    pub fn output(&self, output: &mut [f32]) {
        let mut tone = self.tone.lock();
        let mut last = 0.0;

        for (i, e) in output.iter_mut().enumerate() {
            if i % self.channels as usize == 0 {
                last = tone.as_mut().and_then(|x| x.next()).unwrap_or(0.0) * self.gain;
            }

            *e = last;
        }
    }

    fn set(&self, frequency: Option<u32>) {
        *self.tone.lock() =
            frequency.map(|f| Oscillator::new(f as f32, self.sample_rate).ramp(RAMP));
    }

    #[cfg(test)]
    fn playing(&self) -> Option<f32> {
        self.tone.lock().as_ref().map(Oscillator::frequency)
    }
}

/// Builds (but does not start) an output stream fed by `output`.
pub fn build_stream(
    device: &Device,
    config: &SupportedStreamConfig,
    output: Arc<ToneOutput>,
) -> anyhow::Result<Stream> {
    if config.sample_format() != SampleFormat::F32 {
        anyhow::bail!(
            "Unsupported sample format {:?}, only f32 output is supported",
            config.sample_format()
        );
    }

    let stream_config: StreamConfig = config.clone().into();
    device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| output.output(data),
            |err| error!("Output stream error: {err}"),
            None,
        )
        .context("Failed to build output stream")
}

/// Emitter that sounds tones on a speaker through [`ToneOutput`].
pub struct SpeakerEmitter {
    output: Arc<ToneOutput>,
}

impl SpeakerEmitter {
    pub fn new(output: Arc<ToneOutput>) -> Self {
        Self { output }
    }
}

impl ToneEmitter for SpeakerEmitter {
    fn activate(&mut self, frequency: u32) -> Result<()> {
        let nyquist = self.output.sample_rate / 2;
        if frequency >= nyquist {
            self.output.set(None);
            return Err(Error::Emitter(format!(
                "{frequency}Hz is above the {nyquist}Hz limit of the output"
            )));
        }

        self.output.set(Some(frequency));
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        self.output.set(None);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{SpeakerEmitter, ToneOutput};
    use crate::melody::{Error, ToneEmitter};

    #[test]
    fn test_output_follows_emitter() {
        let output = ToneOutput::new(8000, 2, 0.5);
        let mut emitter = SpeakerEmitter::new(output.clone());
        let mut buf = [1.0; 8];

        output.output(&mut buf);
        assert_eq!(buf, [0.0; 8]);

        emitter.activate(1000).unwrap();
        assert_eq!(output.playing(), Some(1000.0));
        output.output(&mut buf);
        assert!(buf.chunks(2).all(|x| x[0] == x[1]));
        assert!(buf.iter().any(|x| *x != 0.0));
        assert!(buf.iter().all(|x| x.abs() <= 0.5));

        emitter.silence().unwrap();
        output.output(&mut buf);
        assert_eq!(buf, [0.0; 8]);
    }

    #[test]
    fn test_reject_above_nyquist() {
        let output = ToneOutput::new(8000, 1, 1.0);
        let mut emitter = SpeakerEmitter::new(output.clone());

        emitter.activate(440).unwrap();
        assert!(matches!(emitter.activate(4000), Err(Error::Emitter(_))));
        assert_eq!(output.playing(), None);
    }
}
