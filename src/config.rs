//! Run configuration.
//!
//! Loaded from an optional TOML file. Every field carries a serde default so
//! an empty file (or no file at all) yields the reference scenario.

use crate::common::constants::{
    BUFFER_SIZE, BYTES_PER_PIXEL, PAGE_SIZE, STRESS_LOOPS, SURFACE_HEIGHT, SURFACE_WIDTH,
    WORD_SIZE,
};
use crate::common::CacheMode;
use crate::device::SimFault;
use crate::scenario::Geometry;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const SIGNAL_INTERVAL_US: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub stress: StressConfig,
}

impl Config {
    /// Reads, parses and validates a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scenario;
        let surface = (s.width as usize)
            .checked_mul(s.height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{}x{} surface size overflows",
                    s.width, s.height
                ))
            })?;
        if surface != s.buffer_size {
            return Err(ConfigError::Invalid(format!(
                "{}x{} surface is {} bytes but buffer_size is {}",
                s.width, s.height, surface, s.buffer_size
            )));
        }
        if s.page_size == 0 || s.page_size % WORD_SIZE != 0 {
            return Err(ConfigError::Invalid(format!(
                "page_size {} is not a non-zero multiple of {}",
                s.page_size, WORD_SIZE
            )));
        }
        if s.buffer_size == 0 || s.buffer_size % s.page_size != 0 {
            return Err(ConfigError::Invalid(format!(
                "buffer_size {} is not a non-zero multiple of page_size {}",
                s.buffer_size, s.page_size
            )));
        }
        if s.stress_loops == 0 {
            return Err(ConfigError::Invalid("stress_loops must be at least 1".into()));
        }
        if self.stress.signal_interval_us == 0 {
            return Err(ConfigError::Invalid(
                "signal_interval_us must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_stress_loops")]
    pub stress_loops: u32,

    /// Pattern seeds of the two sources; derived from the geometry when absent.
    #[serde(default)]
    pub start: Option<[u32; 2]>,
}

impl ScenarioConfig {
    /// Returns the configured seeds, or `[0, size / 4]` for the configured surface.
    pub fn starts(&self) -> [u32; 2] {
        self.start.unwrap_or_else(|| Geometry::from(self).default_starts())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            width: default_width(),
            height: default_height(),
            page_size: default_page_size(),
            stress_loops: default_stress_loops(),
            start: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_supported_modes")]
    pub supported_cache_modes: Vec<CacheMode>,

    #[serde(default)]
    pub interrupt_every: u32,

    #[serde(default)]
    pub fault: SimFault,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            supported_cache_modes: default_supported_modes(),
            interrupt_every: 0,
            fault: SimFault::None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StressConfig {
    #[serde(default = "default_signal_interval")]
    pub signal_interval_us: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            signal_interval_us: default_signal_interval(),
        }
    }
}

fn default_buffer_size() -> usize {
    BUFFER_SIZE
}

fn default_width() -> u32 {
    SURFACE_WIDTH
}

fn default_height() -> u32 {
    SURFACE_HEIGHT
}

fn default_page_size() -> usize {
    PAGE_SIZE
}

fn default_stress_loops() -> u32 {
    STRESS_LOOPS
}

fn default_backend() -> String {
    "sim".to_string()
}

fn default_supported_modes() -> Vec<CacheMode> {
    CacheMode::ALL.to_vec()
}

fn default_signal_interval() -> u64 {
    SIGNAL_INTERVAL_US
}
