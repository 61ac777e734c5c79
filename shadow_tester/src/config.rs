use anyhow::{Context, Result};
use serde::Deserialize;
use shadow_keys::PipelineConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Serial code the LED controller expects for each default zone label.
const DEFAULT_SERIAL_CODES: [(&str, &str); 13] = [
    ("C", "C"),
    ("C#", "d"),
    ("D", "D"),
    ("D#", "e"),
    ("E", "E"),
    ("F", "F"),
    ("F#", "f"),
    ("G", "G"),
    ("G#", "g"),
    ("A", "A"),
    ("A#", "a"),
    ("B", "B"),
    ("C2", "L"),
];

/// One-second tone per default zone label.
const DEFAULT_SAMPLES: [(&str, &str); 13] = [
    ("C", "261Hz-1000ms-C.wav"),
    ("C#", "277Hz-1000ms-Db.wav"),
    ("D", "293Hz-1000ms-D.wav"),
    ("D#", "311Hz-1000ms-Eb.wav"),
    ("E", "329Hz-1000ms-E.wav"),
    ("F", "349Hz-1000ms-F.wav"),
    ("F#", "369Hz-1000ms-Gb.wav"),
    ("G", "391Hz-1000ms-G.wav"),
    ("G#", "415Hz-1000ms-Ab.wav"),
    ("A", "440Hz-1000ms-A.wav"),
    ("A#", "466Hz-1000ms-Bb.wav"),
    ("B", "493Hz-1000ms-B.wav"),
    ("C2", "523Hz-1000ms-C.wav"),
];

fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Zone label -> bytes sent on press. Labels not listed send themselves.
    pub codes: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            codes: table(&DEFAULT_SERIAL_CODES),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_dir: PathBuf,
    /// Zone label -> WAV file name inside `sample_dir`.
    pub samples: HashMap<String, String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_dir: PathBuf::from("tones"),
            samples: table(&DEFAULT_SAMPLES),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub camera_index: i32,
    pub pipeline: PipelineConfig,
    pub serial: SerialConfig,
    pub audio: AudioConfig,
}

impl RunnerConfig {
    /// Loads the YAML file at `path`, or the built-in defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using built-in defaults");
            return Ok(Self::default());
        };
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&source)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }
}
