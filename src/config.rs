//! Defaults for `play`, from an optional JSON file and then the command line.

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::args::{EmitterKind, PlayArgs};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub emitter: EmitterKind,
    pub output_device: String,
    pub gain: f32,
    pub wait_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emitter: EmitterKind::Speaker,
            output_device: "default".to_owned(),
            gain: 0.5,
            wait_on_close: true,
        }
    }
}

impl Config {
    /// Reads the config file, or the defaults when there is none.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config `{}`", path.display()))?;
        let config = serde_json::from_str::<Self>(&raw)
            .with_context(|| format!("Invalid config `{}`", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Command line flags win over the file.
    pub fn apply(&mut self, args: &PlayArgs) -> anyhow::Result<()> {
        if let Some(emitter) = args.emitter {
            self.emitter = emitter;
        }
        if let Some(device) = &args.output_device {
            self.output_device = device.to_owned();
        }
        if let Some(gain) = args.gain {
            self.gain = gain;
        }
        if args.no_wait {
            self.wait_on_close = false;
        }

        self.validate()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.gain) {
            anyhow::bail!("Gain must be between 0 and 1, got {}", self.gain);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{
        io::Write,
        path::{Path, PathBuf},
    };

    use super::Config;
    use crate::args::{EmitterKind, PlayArgs};

    fn play_args() -> PlayArgs {
        PlayArgs {
            melody: PathBuf::from("song.txt"),
            config: None,
            emitter: None,
            output_device: None,
            gain: None,
            no_wait: false,
            binary: false,
        }
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "emitter": "log", "gain": 0.25 }}"#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.emitter, EmitterKind::Log);
        assert_eq!(config.gain, 0.25);
        assert_eq!(config.output_device, "default");
        assert!(config.wait_on_close);
    }

    #[test]
    fn test_load_rejects_bad_gain() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "gain": 3.0 }}"#).unwrap();
        assert!(Config::load(Some(file.path())).is_err());
        assert!(Config::load(Some(Path::new("/nonexistent/melody.json"))).is_err());
    }

    #[test]
    fn test_args_override() {
        let mut config = Config::default();
        let args = PlayArgs {
            emitter: Some(EmitterKind::Log),
            output_device: Some("hdmi".to_owned()),
            no_wait: true,
            ..play_args()
        };

        config.apply(&args).unwrap();
        assert_eq!(config.emitter, EmitterKind::Log);
        assert_eq!(config.output_device, "hdmi");
        assert_eq!(config.gain, 0.5);
        assert!(!config.wait_on_close);

        let args = PlayArgs {
            gain: Some(-1.0),
            ..play_args()
        };
        assert!(config.apply(&args).is_err());
    }
}
