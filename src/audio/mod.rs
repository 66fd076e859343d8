//! Audio utilities.
//! Sine generation and the cpal output that the speaker emitter drives.

pub mod devices;
pub mod oscillator;
pub mod output;
