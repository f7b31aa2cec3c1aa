//! Prelude module for common re-exports.
//!
//! ```rust
//! use grbl_common::prelude::*;
//! ```

pub use crate::config::{ConfigError, ConfigLoader, LogLevel, MachineConfig, SpindleKind};
pub use crate::consts::{AXIS_LETTERS, MAX_N_AXIS};
pub use crate::exec::{ExecAccessory, ExecAlarm, ExecState, Overrides};
pub use crate::motion::{AxisVector, MotionFlags, PlanLineData, StepVector, ZERO_VECTOR};
pub use crate::position::SharedPosition;
pub use crate::state::{Direction, SystemState};
