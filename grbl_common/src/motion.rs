//! Axis vectors and the metadata that travels with every queued move.

use bitflags::bitflags;

use crate::consts::MAX_N_AXIS;

/// Position or travel per axis, in machine units [mm].
pub type AxisVector = [f32; MAX_N_AXIS];

/// Machine position per axis, in motor steps.
pub type StepVector = [i32; MAX_N_AXIS];

/// All-zero axis vector.
pub const ZERO_VECTOR: AxisVector = [0.0; MAX_N_AXIS];

bitflags! {
    /// Motion classification of a planned line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MotionFlags: u8 {
        /// Rapid (G0) motion, not cutting feed.
        const RAPID_MOTION     = 0x01;
        /// Homing/park motion issued by the controller itself.
        const SYSTEM_MOTION    = 0x02;
        /// Feed override does not apply.
        const NO_FEED_OVERRIDE = 0x04;
        /// Feed rate is inverse time (G93).
        const INVERSE_TIME     = 0x08;
        /// Backlash take-up segment. Planners must not advance their
        /// logical position for these blocks.
        const BACKLASH_MOTION  = 0x10;
    }
}

/// Spindle output requested by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpindleState {
    #[default]
    Disable,
    Cw,
    Ccw,
}

bitflags! {
    /// Coolant outputs requested by a block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CoolantState: u8 {
        const FLOOD = 0x01;
        const MIST  = 0x02;
    }
}

/// Non-positional attributes of a planned line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanLineData {
    /// Feed rate [mm/min], or inverse time when `INVERSE_TIME` is set.
    pub feed_rate: f32,
    /// Spindle speed [rpm].
    pub spindle_speed: f32,
    /// Motion classification.
    pub motion: MotionFlags,
    /// Spindle direction.
    pub spindle: SpindleState,
    /// Coolant outputs.
    pub coolant: CoolantState,
    /// Source line number, if any.
    pub line_number: Option<u32>,
}

impl PlanLineData {
    /// Cutting feed move at the given rate.
    pub fn feed(feed_rate: f32) -> Self {
        Self {
            feed_rate,
            ..Default::default()
        }
    }

    /// Rapid move.
    pub fn rapid() -> Self {
        Self {
            motion: MotionFlags::RAPID_MOTION,
            ..Default::default()
        }
    }

    /// True for backlash take-up segments.
    #[inline]
    pub fn is_backlash_motion(&self) -> bool {
        self.motion.contains(MotionFlags::BACKLASH_MOTION)
    }
}
