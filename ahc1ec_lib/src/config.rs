//! Optional TOML configuration of the tool
//!
//! ```toml
//! [timing]
//! max_retries = 5000
//! poll_delay_us = 50
//! smbus_retries = 1000
//!
//! [platform]
//! sub_devices = [0, 2, 3, 5]
//! table_capacity = 32
//! ```

use core::fmt;
use core::time::Duration;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ec::protocol::EC_MAX_TBL_NUM;
use crate::ec::EcTiming;

const CONFIG_FILE: &str = "ahc1ec_config.toml";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Overrides of the EC timing, unset values keep the defaults
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    pub max_retries: Option<u32>,
    pub poll_delay_us: Option<u64>,
    pub smbus_retries: Option<u32>,
}

impl TimingConfig {
    pub fn ec_timing(&self) -> EcTiming {
        let default = EcTiming::default();
        EcTiming {
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            poll_delay: self
                .poll_delay_us
                .map(Duration::from_micros)
                .unwrap_or(default.poll_delay),
            smbus_retries: self.smbus_retries.unwrap_or(default.smbus_retries),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Sub-device IDs this board has, see [`crate::device::SubDevice`]
    #[serde(default)]
    pub sub_devices: Vec<u32>,
    pub table_capacity: Option<u8>,
}

impl PlatformConfig {
    pub fn table_capacity(&self) -> u8 {
        self.table_capacity.unwrap_or(EC_MAX_TBL_NUM)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "Failed to read {}: {}", path.display(), err),
            ConfigError::Parse(err) => write!(f, "Invalid config: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn parse_config(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(ConfigError::Parse)
}

/// Default locations: next to the executable, then the working directory
fn find_config_file() -> Option<PathBuf> {
    let next_to_exe = std::env::current_exe().ok().map(|mut path| {
        path.pop();
        path.push(CONFIG_FILE);
        path
    });
    next_to_exe
        .into_iter()
        .chain(Some(PathBuf::from(CONFIG_FILE)))
        .find(|path| path.is_file())
}

/// Load the configuration
///
/// An explicitly given file has to exist. Without one, the default locations
/// are tried and if there's no file, the defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match find_config_file() {
            Some(path) => path,
            None => {
                debug!("No {} found, using defaults", CONFIG_FILE);
                return Ok(Config::default());
            }
        },
    };

    let toml_str = std::fs::read_to_string(&path).map_err(|err| ConfigError::Io(path.clone(), err))?;
    let config = parse_config(&toml_str)?;
    debug!("Loaded {}: {:?}", path.display(), config);
    Ok(config)
}
