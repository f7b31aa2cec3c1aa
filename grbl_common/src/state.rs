//! State enums shared by the lifecycle controller and its collaborators.
//!
//! All enums use `#[repr(u8)]` for compact layout in status reports.

use serde::{Deserialize, Serialize};

/// Top-level controller state.
///
/// Owned by the lifecycle controller. Survives every warm reset and is only
/// re-decided by cold init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SystemState {
    /// Ready, no motion queued.
    #[default]
    Idle = 0,
    /// Motion locked out until homing or an explicit unlock.
    Alarm = 1,
    /// G-code check mode, no motion executed.
    CheckMode = 2,
    /// Homing cycle in progress.
    Homing = 3,
    /// Executing queued motion.
    Cycle = 4,
    /// Feed hold active.
    Hold = 5,
    /// Jogging.
    Jog = 6,
    /// Safety door open.
    SafetyDoor = 7,
    /// Sleep mode.
    Sleep = 8,
}

impl SystemState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Alarm),
            2 => Some(Self::CheckMode),
            3 => Some(Self::Homing),
            4 => Some(Self::Cycle),
            5 => Some(Self::Hold),
            6 => Some(Self::Jog),
            7 => Some(Self::SafetyDoor),
            8 => Some(Self::Sleep),
            _ => None,
        }
    }

    /// Whether queued motion commands are refused in this state.
    #[inline]
    pub const fn blocks_motion(&self) -> bool {
        matches!(self, Self::Alarm | Self::SafetyDoor | Self::Sleep)
    }

    /// Name used in status reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Alarm => "Alarm",
            Self::CheckMode => "Check",
            Self::Homing => "Home",
            Self::Cycle => "Run",
            Self::Hold => "Hold",
            Self::Jog => "Jog",
            Self::SafetyDoor => "Door",
            Self::Sleep => "Sleep",
        }
    }
}

/// Last known travel direction of an axis.
///
/// `Unknown` is the neutral value: the next move from `Unknown` never
/// triggers a backlash correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Unknown = 0,
    Positive = 1,
    Negative = 2,
}

impl Direction {
    /// Direction of travel from `from` to `to`, `None` for a zero-length move.
    #[inline]
    pub fn of_travel(from: f32, to: f32) -> Option<Self> {
        if to > from {
            Some(Self::Positive)
        } else if to < from {
            Some(Self::Negative)
        } else {
            None
        }
    }

    /// Sign multiplier (`0.0` for `Unknown`).
    #[inline]
    pub const fn sign(&self) -> f32 {
        match self {
            Self::Unknown => 0.0,
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }

    /// True when `other` is a known direction opposite to `self`.
    #[inline]
    pub const fn reverses(&self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Positive, Self::Negative) | (Self::Negative, Self::Positive)
        )
    }
}
