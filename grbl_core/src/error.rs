//! Error types for the lifecycle controller and the session glue.
//!
//! Initialization failures are fatal and surface from `cold_init()`.
//! A boot into `Alarm` is a deliberate safety lock, not an error, and has no
//! variant here.

use std::fmt;

use grbl_common::config::{ConfigError, SpindleKind};
use grbl_common::state::SystemState;
use thiserror::Error;

/// Subsystems started by cold init, in start order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Client,
    Display,
    Settings,
    Stepper,
    SystemPins,
    MotorDrivers,
    Machine,
    Spindle,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Client => "client",
            Self::Display => "display",
            Self::Settings => "settings",
            Self::Stepper => "stepper",
            Self::SystemPins => "system pins",
            Self::MotorDrivers => "motor drivers",
            Self::Machine => "machine hook",
            Self::Spindle => "spindle",
        };
        f.write_str(name)
    }
}

/// Failure reported by a collaborator's initializer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubsystemError {
    /// Collaborator-specific initialization failure.
    #[error("initialization failed: {0}")]
    InitFailed(String),

    /// Required hardware resource is missing or busy.
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// Persistent settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] ConfigError),
}

/// Fatal lifecycle error. No command loop is entered after one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitError {
    /// A subsystem could not be started during cold init.
    #[error("{subsystem} initialization failed: {source}")]
    Subsystem {
        subsystem: Subsystem,
        #[source]
        source: SubsystemError,
    },

    /// No spindle driver registered for the configured kind.
    #[error("no spindle driver registered for {0:?}")]
    SpindleNotFound(SpindleKind),

    /// `cold_init()` called a second time in the same power cycle.
    #[error("controller already initialized")]
    AlreadyInitialized,

    /// `run_once()` called before `cold_init()`.
    #[error("controller not initialized")]
    NotInitialized,
}

/// Motion command refused by the session glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MotionError {
    /// The current state locks out motion (e.g. `Alarm`).
    #[error("motion locked in {0:?} state")]
    Locked(SystemState),
}
