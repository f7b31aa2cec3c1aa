//! Interfaces to the subsystems the lifecycle controller drives.
//!
//! The controller owns one boxed implementation of each trait and calls
//! them in a fixed order during cold init and warm reset. Hardware backends
//! and the simulated machine implement the same traits.
//!
//! # Call Contracts
//!
//! | Trait | Cold init | Warm reset | Session |
//! |-------|-----------|------------|---------|
//! | `Client` | `init` | `reset_read_buffer` | — |
//! | `Settings` | `init` | — | read-only |
//! | `Stepper` | `init` | `reset` | `executed_backlash_travel` |
//! | `SystemPins`, `MotorDrivers` | `init` | — | — |
//! | `Planner` | — | `reset`, `sync_position` | `enqueue` |
//! | `GcodeParser` | — | `init`, `sync_position` | — |
//! | `Probe` | — | `set_triggered`, `init` | `set_triggered` after a probe stop |
//! | `Coolant`, `Limits` | — | `init` | — |
//! | `Reporter` | — | `init_message` | `status`, `feedback` |

use grbl_common::config::SpindleKind;
use grbl_common::motion::{AxisVector, PlanLineData, ZERO_VECTOR};
use grbl_common::state::SystemState;

use crate::error::SubsystemError;

/// Serial / network transport to the operator.
pub trait Client {
    /// Configure the transport. Fatal on failure.
    fn init(&mut self) -> Result<(), SubsystemError>;

    /// Drop any buffered, unprocessed input.
    fn reset_read_buffer(&mut self);

    /// Start accepting input. Called last in cold init.
    fn begin_input(&mut self);
}

/// Persistent settings store.
pub trait Settings {
    /// Load settings from non-volatile storage.
    fn init(&mut self) -> Result<(), SubsystemError>;

    /// Number of configured axes.
    fn axis_count(&self) -> usize;

    /// Backlash of `axis` [mm]. Expected non-negative.
    fn backlash_amount(&self, axis: usize) -> f32;

    /// Per-axis resolution [steps/mm].
    fn steps_per_mm(&self) -> AxisVector;

    /// Whether the homing cycle is enabled.
    fn homing_enabled(&self) -> bool;

    /// Spindle driver to select at boot.
    fn spindle_kind(&self) -> SpindleKind;
}

/// Step pulse generator.
///
/// Runs in the timer interrupt context. It is the single writer of the
/// shared machine position; everything here is called from the foreground.
pub trait Stepper {
    /// Configure step pins and timers. Fatal on failure.
    fn init(&mut self) -> Result<(), SubsystemError>;

    /// Clear segment buffers and runtime counters.
    fn reset(&mut self);

    /// Travel executed by backlash take-up segments since the last call.
    fn executed_backlash_travel(&mut self) -> AxisVector {
        ZERO_VECTOR
    }
}

/// Limit, control and probe input pins.
pub trait SystemPins {
    /// Configure input pins and interrupts. Fatal on failure.
    fn init(&mut self) -> Result<(), SubsystemError>;
}

/// Stepper motor drivers (enable lines, smart driver configuration).
pub trait MotorDrivers {
    /// Configure and enable the drivers. Fatal on failure.
    fn init(&mut self) -> Result<(), SubsystemError>;
}

/// Motion planner block buffer.
pub trait Planner {
    /// Queue a line to `target`. Returns `false` for an empty block.
    ///
    /// Blocks flagged `BACKLASH_MOTION` are executed but must not advance
    /// the planner's logical position.
    fn enqueue(&mut self, target: &AxisVector, data: &PlanLineData) -> bool;

    /// Clear the block buffer and planner variables.
    fn reset(&mut self);

    /// Set the planner's logical position.
    fn sync_position(&mut self, machine_position: &AxisVector);
}

/// G-code interpreter state.
pub trait GcodeParser {
    /// Restore the default modal state.
    fn init(&mut self);

    /// Set the parser's position.
    fn sync_position(&mut self, machine_position: &AxisVector);
}

/// Probe input.
pub trait Probe {
    fn init(&mut self);

    fn set_triggered(&mut self, triggered: bool);
}

/// Spindle output driver.
pub trait Spindle {
    /// Driver name for reports.
    fn name(&self) -> &'static str;

    /// Configure outputs. Called once after selection.
    fn init(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Turn the spindle off.
    fn stop(&mut self);
}

/// Coolant outputs.
pub trait Coolant {
    fn init(&mut self);
}

/// Limit switch inputs.
pub trait Limits {
    fn init(&mut self);
}

/// Operator-facing messages.
pub trait Reporter {
    /// Banner emitted after every warm reset. Announces the alarm lock when
    /// `state` is `Alarm`.
    fn init_message(&mut self, state: SystemState);

    /// Real-time status report.
    fn status(&mut self, state: SystemState, machine_position: &AxisVector);

    /// Free-form feedback line.
    fn feedback(&mut self, message: &str);
}

/// Board-specific startup hooks. Both default to no-ops.
pub trait MachineHooks {
    /// Bring up an attached display.
    fn display_init(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Machine-specific setup, run after the machine position is cleared.
    fn machine_init(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }
}

/// Hooks for machines without custom startup code.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl MachineHooks for NoHooks {}
