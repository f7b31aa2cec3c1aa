//! Settings loading traits and the machine configuration.
//!
//! The machine configuration stands in for the controller's non-volatile
//! settings: per-axis resolution and backlash, the homing switch and the
//! spindle type. It is loaded from TOML once per settings load and is
//! read-only to the backlash engine and the lifecycle controller.
//!
//! # Usage
//!
//! ```rust,no_run
//! use grbl_common::config::{ConfigLoader, ConfigError, MachineConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MachineConfig::load(Path::new("machine.toml"))?;
//!     config.validate()?;
//!     println!("{} axes", config.axes.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, Level};

use crate::consts::{AXIS_LETTERS, DEFAULT_STEPS_PER_MM, MAX_N_AXIS};
use crate::motion::AxisVector;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Common configuration fields shared across applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "grbl-sim-01"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "grbl".to_string(),
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Spindle driver selected at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpindleKind {
    #[default]
    None,
    Relay,
    Pwm,
    Laser,
}

/// Per-axis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Axis letter or human-readable name.
    pub name: String,
    /// Resolution [steps/mm].
    #[serde(default = "default_steps_per_mm")]
    pub steps_per_mm: f32,
    /// Mechanical lash [mm]. Zero disables compensation on this axis.
    #[serde(default)]
    pub backlash: f32,
}

fn default_steps_per_mm() -> f32 {
    DEFAULT_STEPS_PER_MM
}

impl AxisConfig {
    /// Axis with default resolution and no backlash.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps_per_mm: DEFAULT_STEPS_PER_MM,
            backlash: 0.0,
        }
    }
}

/// Homing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HomingSettings {
    /// Homing cycle enabled. With the init lock, boot enters `Alarm`.
    #[serde(default)]
    pub enable: bool,
}

/// Spindle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpindleSettings {
    #[serde(default)]
    pub kind: SpindleKind,
}

/// Complete machine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    /// Per-axis settings, indexed by axis ordinal.
    pub axes: Vec<AxisConfig>,
    #[serde(default)]
    pub homing: HomingSettings,
    #[serde(default)]
    pub spindle: SpindleSettings,
}

impl Default for MachineConfig {
    /// Factory settings: X, Y, Z with default resolution and no backlash.
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            axes: AXIS_LETTERS[..3]
                .iter()
                .map(|c| AxisConfig::named(&c.to_string()))
                .collect(),
            homing: HomingSettings::default(),
            spindle: SpindleSettings::default(),
        }
    }
}

impl MachineConfig {
    /// Validate parameter bounds.
    ///
    /// Negative or non-finite backlash is rejected here so that the
    /// backlash engine only ever sees trusted amounts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        if self.axes.is_empty() || self.axes.len() > MAX_N_AXIS {
            return Err(ConfigError::ValidationError(format!(
                "axis count {} out of range [1, {}]",
                self.axes.len(),
                MAX_N_AXIS
            )));
        }
        for (i, axis) in self.axes.iter().enumerate() {
            if !axis.steps_per_mm.is_finite() || axis.steps_per_mm <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "axis {i} ({}): steps_per_mm {} must be > 0",
                    axis.name, axis.steps_per_mm
                )));
            }
            if !axis.backlash.is_finite() || axis.backlash < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "axis {i} ({}): backlash {} must be >= 0",
                    axis.name, axis.backlash
                )));
            }
        }
        Ok(())
    }

    /// Number of configured axes.
    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Backlash amount of `axis` [mm], zero for unconfigured axes.
    pub fn backlash(&self, axis: usize) -> f32 {
        self.axes.get(axis).map_or(0.0, |a| a.backlash)
    }

    /// Per-axis resolution, zero for unconfigured axes.
    pub fn steps_per_mm(&self) -> AxisVector {
        let mut out = [0.0f32; MAX_N_AXIS];
        for (dst, axis) in out.iter_mut().zip(self.axes.iter()) {
            *dst = axis.steps_per_mm;
        }
        out
    }
}
