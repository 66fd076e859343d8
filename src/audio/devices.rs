//! Picks the output device at startup.

use anyhow::Context;
use cpal::{
    traits::{DeviceTrait, HostTrait},
    Device, SupportedStreamConfig,
};

use crate::misc::Similarity;

/// Output device and the config the stream will be built with.
pub struct Output {
    pub device: Device,
    pub config: SupportedStreamConfig,
}

impl Output {
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "<unknown>".to_owned())
    }
}

/// Finds an output device by name.
/// `default` picks the host default, anything else picks the device whose name has
/// the highest string similarity (dice coefficient) to `wanted`.
pub fn output_device(wanted: &str) -> anyhow::Result<Output> {
    let host = cpal::default_host();
    let wanted = wanted.to_lowercase();

    let device = match wanted.as_str() {
        "default" => host
            .default_output_device()
            .context("No default output device")?,
        _ => host
            .output_devices()
            .context("Failed to list output devices")?
            .filter_map(|x| Some((x.name().ok()?.to_lowercase().similarity(&wanted), x)))
            .reduce(|a, b| if a.0 > b.0 { a } else { b })
            .context("No output device found")?
            .1,
    };

    let config = device
        .default_output_config()
        .context("No default output config")?;

    Ok(Output { device, config })
}
