//! TOML-backed persistent settings store.
//!
//! A missing file behaves like blank non-volatile storage on first boot:
//! factory defaults are restored and the controller keeps starting. A file
//! that exists but cannot be parsed or validated is fatal.

use std::path::{Path, PathBuf};

use grbl_common::config::{ConfigError, ConfigLoader, LogLevel, MachineConfig, SpindleKind};
use grbl_common::motion::AxisVector;
use tracing::{info, warn};

use crate::collaborators::Settings;
use crate::error::SubsystemError;

/// Settings loaded from a machine TOML file.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: Option<PathBuf>,
    config: MachineConfig,
}

impl FileSettings {
    /// Settings read from `path` during `init()`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            config: MachineConfig::default(),
        }
    }

    /// In-memory settings. `init()` only validates.
    pub fn from_config(config: MachineConfig) -> Self {
        Self { path: None, config }
    }

    /// Currently loaded configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// `[shared] log_level` of the file at `path`.
    ///
    /// Read before logging is up, so a missing or unreadable file falls back
    /// to the default level silently. `init()` reports the actual problem.
    pub fn log_level(path: impl AsRef<Path>) -> LogLevel {
        MachineConfig::load(path.as_ref())
            .map(|config| config.shared.log_level)
            .unwrap_or_default()
    }
}

impl Settings for FileSettings {
    fn init(&mut self) -> Result<(), SubsystemError> {
        if let Some(path) = &self.path {
            match MachineConfig::load(path) {
                Ok(config) => {
                    self.config = config;
                    info!("Settings loaded from {}", path.display());
                }
                Err(ConfigError::FileNotFound) => {
                    warn!(
                        "No settings at {}, restoring factory defaults",
                        path.display()
                    );
                    self.config = MachineConfig::default();
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.config.validate()?;
        Ok(())
    }

    fn axis_count(&self) -> usize {
        self.config.axis_count()
    }

    fn backlash_amount(&self, axis: usize) -> f32 {
        self.config.backlash(axis)
    }

    fn steps_per_mm(&self) -> AxisVector {
        self.config.steps_per_mm()
    }

    fn homing_enabled(&self) -> bool {
        self.config.homing.enable
    }

    fn spindle_kind(&self) -> SpindleKind {
        self.config.spindle.kind
    }
}
