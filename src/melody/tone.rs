//! The unit of playback.

use std::time::Duration;

use super::{Error, Result};

/// A single note: a frequency held for some number of milliseconds.
/// A frequency of zero is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tone {
    pub frequency: u32,
    pub duration: u32,
}

impl Tone {
    /// Size of one tone on the wire.
    /// Frequency then duration, both little endian u32.
    pub const ENCODED_SIZE: usize = 8;

    pub const fn new(frequency: u32, duration: u32) -> Self {
        Self {
            frequency,
            duration,
        }
    }

    pub const fn rest(duration: u32) -> Self {
        Self::new(0, duration)
    }

    pub fn is_rest(&self) -> bool {
        self.frequency == 0
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.duration as u64)
    }

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut out = [0; Self::ENCODED_SIZE];
        out[..4].copy_from_slice(&self.frequency.to_le_bytes());
        out[4..].copy_from_slice(&self.duration.to_le_bytes());
        out
    }

    /// Decodes a buffer of packed tones.
    /// The length must be a nonzero multiple of [`Tone::ENCODED_SIZE`].
    pub fn decode_all(buf: &[u8]) -> Result<Vec<Self>> {
        if buf.is_empty() || buf.len() % Self::ENCODED_SIZE != 0 {
            return Err(Error::InvalidBufferSize(buf.len()));
        }

        Ok(buf
            .chunks_exact(Self::ENCODED_SIZE)
            .map(|x| Self {
                frequency: u32::from_le_bytes([x[0], x[1], x[2], x[3]]),
                duration: u32::from_le_bytes([x[4], x[5], x[6], x[7]]),
            })
            .collect())
    }

    pub fn encode_all(tones: &[Self]) -> Vec<u8> {
        tones.iter().flat_map(|x| x.to_bytes()).collect()
    }

    /// Parses a melody from text.
    /// The format is as follows:
    /// ```text
    /// # Freq;time(ms)
    /// 440;500
    /// 0;100
    /// 880;250
    /// ```
    pub fn parse_melody(seq: &str) -> Result<Vec<Self>> {
        let mut tones = Vec::new();

        for (i, line) in seq.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let err = |reason: String| Error::Melody { line: i + 1, reason };
            let (freq, time) = line
                .split_once(';')
                .ok_or_else(|| err("expected `frequency;duration`".to_owned()))?;
            let frequency = freq
                .trim()
                .parse::<u32>()
                .map_err(|e| err(format!("bad frequency `{}`: {e}", freq.trim())))?;
            let duration = time
                .trim()
                .parse::<u32>()
                .map_err(|e| err(format!("bad duration `{}`: {e}", time.trim())))?;

            if duration == 0 {
                return Err(err("duration must be greater than zero".to_owned()));
            }

            tones.push(Self::new(frequency, duration));
        }

        Ok(tones)
    }
}
