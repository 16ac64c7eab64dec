//! Configuration for stardrift.
//!
//! Settings are read from `config.toml` in the platform config directory
//! (or the directory named by `STARDRIFT_CONFIG`). A missing file yields
//! the defaults; every field may be omitted.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use stardrift_core::{CloudSpec, PAGE_BACKGROUND, Rgb};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "STARDRIFT_CONFIG";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

const MIN_FRAME_RATE: u32 = 1;
const MAX_FRAME_RATE: u32 = 240;
const MAX_PIXEL_RATIO: u8 = 4;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("remote engine source requires an `engine.url`")]
    MissingEngineUrl,
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file.
    File(PathBuf),
    /// No file at this path; defaults apply.
    Defaults(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "config from {}", path.display()),
            Self::Defaults(path) => write!(f, "default config (no file at {})", path.display()),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Animation frames per second.
    pub frame_rate: u32,
    /// Samples per terminal cell along each axis.
    pub pixel_ratio: u8,
    /// Page background painted behind the backdrop.
    pub background: Rgb,
    pub engine: EngineConfig,
    pub backdrop: BackdropConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            pixel_ratio: 2,
            background: PAGE_BACKGROUND,
            engine: EngineConfig::default(),
            backdrop: BackdropConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Where the rendering engine descriptor comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineSource {
    /// Built into the binary; available immediately.
    #[default]
    Bundled,
    /// Fetched over HTTP from `engine.url`.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub source: EngineSource,
    pub url: Option<String>,
    /// Global request timeout for remote fetches.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source: EngineSource::Bundled,
            url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    pub star_count: usize,
    pub dust_count: usize,
    /// Fixed seed for point generation; random when absent.
    pub seed: Option<u64>,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            star_count: CloudSpec::STARS.count,
            dust_count: CloudSpec::DUST.count,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log file; defaults to `stardrift.log` in the data directory.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load the configuration file, falling back to defaults when it is absent.
    ///
    /// Runs before logging is set up, so the caller reports the source.
    pub fn load() -> Result<(Self, ConfigSource), ConfigError> {
        Self::load_from(&config_dir().join(CONFIG_FILE))
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults(path.to_path_buf())));
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validated()
    }

    /// Clamp numeric ranges and check cross-field requirements.
    fn validated(mut self) -> Result<Self, ConfigError> {
        self.frame_rate = self.frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE);
        self.pixel_ratio = self.pixel_ratio.clamp(1, MAX_PIXEL_RATIO);
        if self.engine.source == EngineSource::Remote && self.engine.url.is_none() {
            return Err(ConfigError::MissingEngineUrl);
        }
        Ok(self)
    }

    /// Path of the log file.
    pub fn log_path(&self) -> PathBuf {
        self.log
            .file
            .clone()
            .unwrap_or_else(|| data_dir().join("stardrift.log"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "stardrift")
}

/// Directory holding `config.toml`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Directory for runtime data such as the log file.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}
