//! Request-level front of the sequencer.
//! Validates raw buffers and routes control codes to the [`Controller`].

use tracing::{debug, info, warn};

use crate::melody::{Controller, Error, Result, Tone, ToneEmitter, STATUS_SUCCESS};

/// Device type used in the control codes.
pub const MELODY_DEVICE: u32 = 0x8003;

/// Enqueue a buffer of packed tones.
pub const IOCTL_MELODY_PLAY: u32 = ctl_code(MELODY_DEVICE, 0x800);
/// Set wait-on-close from a one byte bool.
pub const IOCTL_MELODY_WAIT_ON_CLOSE: u32 = ctl_code(MELODY_DEVICE, 0x801);

const METHOD_BUFFERED: u32 = 0;
const FILE_ANY_ACCESS: u32 = 0;

const fn ctl_code(device_type: u32, function: u32) -> u32 {
    (device_type << 16) | (FILE_ANY_ACCESS << 14) | (function << 2) | METHOD_BUFFERED
}

/// Takes the declared input length and the buffer, which a caller may leave out.
type Handler = fn(&MelodyDevice, usize, Option<&[u8]>) -> Result<usize>;

/// Control code -> (name, handler).
const CONTROL_TABLE: &[(u32, &str, Handler)] = &[
    (IOCTL_MELODY_PLAY, "play", MelodyDevice::submit_tones),
    (
        IOCTL_MELODY_WAIT_ON_CLOSE,
        "wait-on-close",
        MelodyDevice::set_wait_on_close,
    ),
];

/// One tone device.
/// Created by [`MelodyDevice::load`] and torn down by [`MelodyDevice::unload`].
pub struct MelodyDevice {
    controller: Controller,
}

impl MelodyDevice {
    pub fn load(emitter: impl ToneEmitter + 'static) -> Self {
        info!("Melody device loaded");
        Self {
            controller: Controller::new(emitter),
        }
    }

    pub fn unload(self) {
        self.controller.shutdown();
        info!("Melody device unloaded");
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn open_session(&self) -> Result<()> {
        self.controller.start()
    }

    /// Always completes; blocks only when wait-on-close is set.
    pub fn close_session(&self) {
        self.controller.stop();
    }

    /// Decodes and enqueues packed tones, returning the number of bytes consumed.
    /// The length is checked before the buffer is looked at.
    pub fn submit_tones(&self, length: usize, buffer: Option<&[u8]>) -> Result<usize> {
        if length == 0 || length % Tone::ENCODED_SIZE != 0 {
            return Err(Error::InvalidBufferSize(length));
        }

        let data = buffer
            .and_then(|x| x.get(..length))
            .ok_or(Error::InvalidParameter)?;
        let tones = Tone::decode_all(data)?;
        self.controller.enqueue_tones(&tones)?;
        Ok(length)
    }

    /// Reads a one byte flag, nonzero meaning wait.
    pub fn set_wait_on_close(&self, length: usize, buffer: Option<&[u8]>) -> Result<usize> {
        if length == 0 {
            return Err(Error::BufferTooSmall);
        }

        let &flag = buffer
            .and_then(<[u8]>::first)
            .ok_or(Error::InvalidParameter)?;

        self.controller.set_wait_on_close(flag != 0);
        debug!("Wait on close set to {}", flag != 0);
        Ok(1)
    }

    /// Routes a control request, returning the bytes consumed.
    pub fn control(&self, code: u32, length: usize, buffer: Option<&[u8]>) -> Result<usize> {
        let Some((_, name, handler)) = CONTROL_TABLE.iter().find(|x| x.0 == code) else {
            warn!("Unknown control code {code:#010x}");
            return Err(Error::InvalidDeviceRequest(code));
        };

        debug!("Control `{name}` ({length} bytes)");
        handler(self, length, buffer)
    }

    /// [`MelodyDevice::control`] flattened to a (status, information) pair.
    pub fn complete(&self, code: u32, length: usize, buffer: Option<&[u8]>) -> (u32, usize) {
        match self.control(code, length, buffer) {
            Ok(info) => (STATUS_SUCCESS, info),
            Err(e) => (e.status(), 0),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::{MelodyDevice, IOCTL_MELODY_PLAY, IOCTL_MELODY_WAIT_ON_CLOSE};
    use crate::melody::{
        emitter::{EmitterEvent, RecordingEmitter},
        Error, Tone, STATUS_SUCCESS,
    };

    fn device() -> (MelodyDevice, RecordingEmitter) {
        let emitter = RecordingEmitter::default();
        (MelodyDevice::load(emitter.clone()), emitter)
    }

    #[test]
    fn test_control_codes() {
        assert_eq!(IOCTL_MELODY_PLAY, 0x8003_2000);
        assert_eq!(IOCTL_MELODY_WAIT_ON_CLOSE, 0x8003_2004);
    }

    #[test]
    fn test_session_through_control() {
        let (dev, emitter) = device();
        dev.open_session().unwrap();

        let buf = Tone::encode_all(&[Tone::new(440, 40), Tone::new(880, 20)]);
        assert_eq!(dev.control(IOCTL_MELODY_PLAY, buf.len(), Some(&buf)), Ok(16));
        assert_eq!(
            dev.control(IOCTL_MELODY_WAIT_ON_CLOSE, 1, Some(&[1])),
            Ok(1)
        );

        let start = Instant::now();
        dev.close_session();
        assert!(start.elapsed() >= Duration::from_millis(55));
        assert_eq!(
            emitter.events(),
            vec![
                EmitterEvent::Activate(440),
                EmitterEvent::Activate(880),
                EmitterEvent::Silence
            ]
        );

        dev.unload();
    }

    #[test]
    fn test_reject_bad_tone_buffers() {
        let (dev, _) = device();
        dev.open_session().unwrap();

        assert_eq!(
            dev.submit_tones(0, Some(&[])),
            Err(Error::InvalidBufferSize(0))
        );
        assert_eq!(
            dev.submit_tones(9, Some(&[0; 9])),
            Err(Error::InvalidBufferSize(9))
        );
        assert_eq!(dev.submit_tones(0, None), Err(Error::InvalidBufferSize(0)));
        assert_eq!(dev.controller().queued(), 0);

        assert_eq!(
            dev.complete(IOCTL_MELODY_PLAY, 3, Some(&[0; 3])),
            (0xC000_0206, 0)
        );
    }

    #[test]
    fn test_missing_tone_buffer() {
        let (dev, _) = device();
        dev.open_session().unwrap();

        assert_eq!(dev.submit_tones(16, None), Err(Error::InvalidParameter));
        assert_eq!(
            dev.submit_tones(16, Some(&[0; 8])),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            dev.complete(IOCTL_MELODY_PLAY, 8, None),
            (0xC000_000D, 0)
        );
        assert_eq!(dev.controller().queued(), 0);
    }

    #[test]
    fn test_reject_bad_flag() {
        let (dev, _) = device();
        dev.controller().set_wait_on_close(true);

        assert_eq!(
            dev.set_wait_on_close(0, Some(&[])),
            Err(Error::BufferTooSmall)
        );
        assert_eq!(dev.set_wait_on_close(0, None), Err(Error::BufferTooSmall));
        assert_eq!(
            dev.set_wait_on_close(1, None),
            Err(Error::InvalidParameter)
        );
        assert!(dev.controller().wait_on_close());

        assert_eq!(dev.set_wait_on_close(2, Some(&[0, 1])), Ok(1));
        assert!(!dev.controller().wait_on_close());
    }

    #[test]
    fn test_unknown_control_code() {
        let (dev, _) = device();
        assert_eq!(
            dev.control(0x8003_2008, 1, Some(&[1])),
            Err(Error::InvalidDeviceRequest(0x8003_2008))
        );
        assert_eq!(dev.complete(0, 0, None), (0xC000_0010, 0));
        assert_eq!(
            dev.complete(IOCTL_MELODY_WAIT_ON_CLOSE, 1, Some(&[1])),
            (STATUS_SUCCESS, 1)
        );
    }
}
