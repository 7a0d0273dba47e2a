//! Run configuration for the orbit example
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! solver = "rkf45"
//!
//! [system]
//! eccentricity = 0.2
//!
//! [grid]
//! days = 730
//! ```

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orbit::{PhysicalSystem, SECONDS_IN_DAY};

/// Errors from loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// File is not valid TOML for [`RunConfig`]
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path that was parsed
        path: String,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

/// Everything needed to run one orbit evolution
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Physical system
    pub system: SystemConfig,
    /// Sampling grid
    pub grid: GridConfig,
    /// Solver name, parsed into a `SolverKind` at run time
    pub solver: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            grid: GridConfig::default(),
            solver: "rkf45".to_string(),
        }
    }
}

/// Physical parameters in SI units
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    /// Total mass [kg]
    pub mass: f64,
    /// Semi-major axis [m]
    pub semi_major_axis: f64,
    /// Eccentricity
    pub eccentricity: f64,
    /// Longitude of pericenter [rad]
    pub pericenter_longitude: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let sun_earth = PhysicalSystem::sun_earth();
        Self {
            mass: sun_earth.mass,
            semi_major_axis: sun_earth.semi_major_axis,
            eccentricity: sun_earth.eccentricity,
            pericenter_longitude: 0.0,
        }
    }
}

/// Output time grid
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Number of samples after the reference time
    pub days: usize,
    /// Spacing between samples [s]
    pub sample_interval: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            days: 365,
            sample_interval: SECONDS_IN_DAY,
        }
    }
}

impl GridConfig {
    /// Times `[0, dt, 2·dt, …, days·dt]` in seconds
    pub fn times(&self) -> Vec<f64> {
        (0..=self.days)
            .map(|i| i as f64 * self.sample_interval)
            .collect()
    }
}

impl RunConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load configuration from a file, falling back to defaults if it is
    /// missing or malformed
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::Io { path, .. }) => {
                info!("Config file {} not found. Using defaults.", path);
                Self::default()
            }
            Err(e) => {
                warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
