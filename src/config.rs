use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::arrangement::DrumGroove;
use crate::core::audio::{DeviceConfig, DeviceSelector};
use crate::core::phrase::Key;
use crate::core::sequencer::Sequencer;
use crate::core::synth::MixerSettings;
use crate::error::{Result, SynthError};

const APP_DIR: &str = "moodsynth";
const CONFIG_FILE: &str = "config.json";

/// Everything a playback session can be configured with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Output device by name, takes precedence over `device_index`
    pub device: Option<String>,
    pub device_index: Option<usize>,

    pub sample_rate: u32,
    pub channels: u16,
    pub block_count: usize,
    pub block_samples: usize,

    /// Beats per minute
    pub tempo: f64,
    pub beats: usize,
    pub sub_beats: usize,
    /// Drum groove name, see [`DrumGroove::name`]
    pub groove: String,
    /// Key of the lead phrases, see [`Key::name`]
    pub key: String,

    pub initial_mood: i32,
    pub mixer: MixerSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let device = DeviceConfig::default();
        Self {
            device: None,
            device_index: None,
            sample_rate: device.sample_rate,
            channels: device.channels,
            block_count: device.block_count,
            block_samples: device.block_samples,
            tempo: 120.0,
            beats: 4,
            sub_beats: 4,
            groove: DrumGroove::default().name().to_string(),
            key: Key::default().name().to_string(),
            initial_mood: 10,
            mixer: MixerSettings::default(),
        }
    }
}

impl SessionConfig {
    /// `<config dir>/moodsynth/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| SynthError::Config("could not find config directory".into()))?;
        path.push(APP_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Load the user's config, or the defaults when there is none yet.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let io_err = |what: &str, e: std::io::Error| {
            SynthError::Config(format!("failed to {what} {}: {e}", path.display()))
        };

        let mut file = File::open(path).map_err(|e| io_err("open", e))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| io_err("read", e))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| SynthError::Config(format!("failed to parse {}: {e}", path.display())))?;

        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let io_err = |what: &str, e: std::io::Error| {
            SynthError::Config(format!("failed to {what} {}: {e}", path.display()))
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_err("create directory for", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SynthError::Config(format!("failed to serialize config: {e}")))?;

        let mut file = File::create(path).map_err(|e| io_err("create", e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| io_err("write", e))?;

        Ok(())
    }

    /// The validated device side of the config.
    pub fn device_config(&self) -> Result<DeviceConfig> {
        let config = DeviceConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            block_count: self.block_count,
            block_samples: self.block_samples,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn device_selector(&self) -> DeviceSelector {
        match (&self.device, self.device_index) {
            (Some(name), _) => DeviceSelector::Name(name.clone()),
            (None, Some(index)) => DeviceSelector::Index(index),
            (None, None) => DeviceSelector::Default,
        }
    }

    pub fn drum_groove(&self) -> Result<DrumGroove> {
        DrumGroove::from_name(&self.groove)
            .ok_or_else(|| SynthError::Config(format!("unknown drum groove {:?}", self.groove)))
    }

    pub fn key(&self) -> Result<Key> {
        Key::from_name(&self.key)
            .ok_or_else(|| SynthError::Config(format!("unknown key {:?}", self.key)))
    }

    /// A sequencer at the configured tempo and bar shape.
    pub fn sequencer(&self) -> Result<Sequencer> {
        Sequencer::new(self.tempo, self.beats, self.sub_beats)
    }
}
