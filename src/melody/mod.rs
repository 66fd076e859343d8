//! Queued tone sequencer.
//! Callers push [`Tone`]s into a [`Controller`], a worker thread plays them
//! through a [`ToneEmitter`] one at a time, in order.

use thiserror::Error;

pub mod controller;
pub mod emitter;
pub mod queue;
pub mod tone;
pub mod worker;

pub use controller::Controller;
pub use emitter::ToneEmitter;
pub use tone::Tone;

/// NT status returned for a successful request.
pub const STATUS_SUCCESS: u32 = 0x0000_0000;

/// Errors returned to callers of the sequencer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A worker thread (or the emitter it needs) could not be set up.
    #[error("insufficient resources: {0}")]
    InsufficientResources(String),

    /// An empty or otherwise unusable tone sequence.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Tone payload length is zero or not a whole number of tones.
    #[error("invalid buffer size: {0} bytes")]
    InvalidBufferSize(usize),

    /// No buffer was supplied with the request.
    #[error("invalid parameter: missing buffer")]
    InvalidParameter,

    /// The supplied buffer cannot hold the request payload.
    #[error("buffer too small")]
    BufferTooSmall,

    /// Unknown control code.
    #[error("invalid device request: {0:#010x}")]
    InvalidDeviceRequest(u32),

    /// The output device rejected a command.
    #[error("emitter error: {0}")]
    Emitter(String),

    /// A line of a text melody could not be parsed.
    #[error("melody line {line}: {reason}")]
    Melody { line: usize, reason: String },
}

impl Error {
    /// The NT status code a driver would complete the request with.
    pub fn status(&self) -> u32 {
        match self {
            Self::InsufficientResources(_) => 0xC000_009A,
            Self::InvalidArgument(_) | Self::Melody { .. } => 0xC000_000D,
            Self::InvalidBufferSize(_) => 0xC000_0206,
            Self::InvalidParameter => 0xC000_000D,
            Self::BufferTooSmall => 0xC000_0023,
            Self::InvalidDeviceRequest(_) => 0xC000_0010,
            Self::Emitter(_) => 0xC000_0185,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::InvalidBufferSize(3).status(), 0xC000_0206);
        assert_eq!(Error::BufferTooSmall.status(), 0xC000_0023);
        assert_eq!(Error::InvalidDeviceRequest(1).status(), 0xC000_0010);
        assert_eq!(
            Error::InsufficientResources("thread".into()).status(),
            0xC000_009A
        );
    }
}
