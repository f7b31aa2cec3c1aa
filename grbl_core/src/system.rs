//! Controller-wide runtime state.
//!
//! [`ControllerState`] aggregates everything the lifecycle controller owns.
//! A warm reset rebuilds it from `Default` and carries over only the
//! fields that must survive a session restart.

use grbl_common::exec::{ExecAccessory, ExecAlarm, ExecState, Overrides, StepControl, Suspend};
use grbl_common::motion::StepVector;
use grbl_common::consts::MAX_N_AXIS;
use grbl_common::state::SystemState;
use static_assertions::const_assert;

// `homing_axis_lock` holds one bit per axis.
const_assert!(MAX_N_AXIS <= u8::BITS as usize);

/// Real-time requests raised between foreground passes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Realtime {
    pub exec_state: ExecState,
    pub exec_accessory: ExecAccessory,
    pub exec_alarm: ExecAlarm,
    pub cycle_stop: bool,
    /// Override values requested but not yet applied.
    pub pending_overrides: Overrides,
}

/// Controller-wide runtime state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    // ── Preserved across warm reset ──
    /// Top-level machine state.
    pub state: SystemState,
    /// A homing cycle completed during this power cycle.
    pub homing_completed: bool,

    // ── Cleared by warm reset ──
    /// A system abort was requested; the session unwinds.
    pub abort: bool,
    pub suspend: Suspend,
    pub soft_limit: bool,
    pub step_control: StepControl,
    pub probe_succeeded: bool,
    /// Axes locked out during a homing cycle, as a bitmask.
    pub homing_axis_lock: u8,
    pub overrides: Overrides,
    pub spindle_stop_override: bool,
    pub report_override_counter: u8,
    pub report_wco_counter: u8,
    /// Programmed spindle speed [rpm].
    pub spindle_speed: f32,
    /// Machine position at the last probe contact [steps].
    pub probe_position: StepVector,
    pub probe_triggered: bool,
    pub realtime: Realtime,
}

impl ControllerState {
    /// Clear every transient field, keeping `state` and `homing_completed`.
    pub fn reset_for_session(&mut self) {
        *self = Self {
            state: self.state,
            homing_completed: self.homing_completed,
            ..Self::default()
        };
    }
}
