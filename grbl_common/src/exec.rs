//! Real-time execution flags, alarms and override values.
//!
//! These are the transient runtime fields that every warm reset clears.
//! Flag sets use the `bitflags` crate for compact representation.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{
    FEED_OVERRIDE_DEFAULT, FEED_OVERRIDE_MAX, FEED_OVERRIDE_MIN, RAPID_OVERRIDE_DEFAULT,
    RAPID_OVERRIDE_LEVELS, SPINDLE_OVERRIDE_DEFAULT, SPINDLE_OVERRIDE_MAX, SPINDLE_OVERRIDE_MIN,
};

bitflags! {
    /// Pending real-time execution requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExecState: u8 {
        const STATUS_REPORT = 0x01;
        const CYCLE_START   = 0x02;
        const CYCLE_STOP    = 0x04;
        const FEED_HOLD     = 0x08;
        const RESET         = 0x10;
        const SAFETY_DOOR   = 0x20;
        const MOTION_CANCEL = 0x40;
        const SLEEP         = 0x80;
    }
}

bitflags! {
    /// Pending accessory override toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExecAccessory: u8 {
        const SPINDLE_OVR_STOP        = 0x01;
        const COOLANT_FLOOD_OVR_TOGGLE = 0x02;
        const COOLANT_MIST_OVR_TOGGLE  = 0x04;
    }
}

bitflags! {
    /// Suspend (hold / door / sleep) bookkeeping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Suspend: u8 {
        const HOLD_COMPLETE    = 0x01;
        const RESTART_RETRACT  = 0x02;
        const RETRACT_COMPLETE = 0x04;
        const INITIATE_RESTORE = 0x08;
        const RESTORE_COMPLETE = 0x10;
        const SAFETY_DOOR_AJAR = 0x20;
        const MOTION_CANCEL    = 0x40;
        const JOG_CANCEL       = 0x80;
    }
}

bitflags! {
    /// Stepper control requests raised by the foreground.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StepControl: u8 {
        const END_MOTION         = 0x01;
        const EXECUTE_HOLD       = 0x02;
        const EXECUTE_SYS_MOTION = 0x04;
        const UPDATE_SPINDLE_PWM = 0x08;
    }
}

/// Alarm codes raised from the real-time path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ExecAlarm {
    #[default]
    None = 0,
    HardLimit = 1,
    SoftLimit = 2,
    AbortCycle = 3,
    ProbeFailInitial = 4,
    ProbeFailContact = 5,
    HomingFailReset = 6,
    HomingFailDoor = 7,
    HomingFailPulloff = 8,
    HomingFailApproach = 9,
    SpindleControl = 10,
}

impl ExecAlarm {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::HardLimit),
            2 => Some(Self::SoftLimit),
            3 => Some(Self::AbortCycle),
            4 => Some(Self::ProbeFailInitial),
            5 => Some(Self::ProbeFailContact),
            6 => Some(Self::HomingFailReset),
            7 => Some(Self::HomingFailDoor),
            8 => Some(Self::HomingFailPulloff),
            9 => Some(Self::HomingFailApproach),
            10 => Some(Self::SpindleControl),
            _ => None,
        }
    }
}

/// Feed, rapid and spindle override percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    /// Feed override [%].
    pub feed: u8,
    /// Rapid override [%].
    pub rapid: u8,
    /// Spindle speed override [%].
    pub spindle: u8,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            feed: FEED_OVERRIDE_DEFAULT,
            rapid: RAPID_OVERRIDE_DEFAULT,
            spindle: SPINDLE_OVERRIDE_DEFAULT,
        }
    }
}

impl Overrides {
    /// Set feed override, clamped to the allowed range.
    pub fn set_feed(&mut self, percent: u8) {
        self.feed = percent.clamp(FEED_OVERRIDE_MIN, FEED_OVERRIDE_MAX);
    }

    /// Set spindle override, clamped to the allowed range.
    pub fn set_spindle(&mut self, percent: u8) {
        self.spindle = percent.clamp(SPINDLE_OVERRIDE_MIN, SPINDLE_OVERRIDE_MAX);
    }

    /// Set rapid override. Only the discrete levels are accepted.
    pub fn set_rapid(&mut self, percent: u8) -> bool {
        if RAPID_OVERRIDE_LEVELS.contains(&percent) {
            self.rapid = percent;
            true
        } else {
            false
        }
    }
}
