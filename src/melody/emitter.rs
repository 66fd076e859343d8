//! Output side of the sequencer.

use tracing::info;

use super::Result;

/// Something that can make (or stop making) a tone.
/// Only the playback worker ever calls these, so implementations need no locking
/// of their own beyond what they share with an audio callback.
pub trait ToneEmitter: Send {
    /// Start sounding `frequency` Hz until told otherwise.
    fn activate(&mut self, frequency: u32) -> Result<()>;
    fn silence(&mut self) -> Result<()>;
}

/// Emitter with no audio, just log lines.
/// Handy on machines without an output device.
#[derive(Default)]
pub struct LogEmitter {
    sounding: Option<u32>,
}

impl ToneEmitter for LogEmitter {
    fn activate(&mut self, frequency: u32) -> Result<()> {
        info!("Beep {frequency}Hz");
        self.sounding = Some(frequency);
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        if let Some(freq) = self.sounding.take() {
            info!("Silence (was {freq}Hz)");
        }
        Ok(())
    }
}

#[cfg(test)]
pub use recording::{EmitterEvent, RecordingEmitter};
