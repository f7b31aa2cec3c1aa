//! Machine position handoff between the stepper context and the foreground.
//!
//! The stepper side is the only writer. The foreground never reads the raw
//! counters directly: it takes a [`SharedPosition::snapshot`], which retries
//! until it observes a committed, untorn copy of every axis.
//!
//! ## Lock-Free Protocol
//!
//! `seq` uses the odd/even protocol:
//! - Odd = write in progress (reader must retry)
//! - Even = committed (reader can safely use the copy)

use std::sync::atomic::{fence, AtomicI32, AtomicU32, Ordering};

use crate::consts::MAX_N_AXIS;
use crate::motion::{AxisVector, StepVector};

/// Sequence-locked machine position in motor steps.
#[derive(Debug)]
pub struct SharedPosition {
    seq: AtomicU32,
    steps: [AtomicI32; MAX_N_AXIS],
}

impl SharedPosition {
    /// Create a zeroed position.
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            steps: [const { AtomicI32::new(0) }; MAX_N_AXIS],
        }
    }

    /// Publish a complete position. Single writer only.
    pub fn publish(&self, steps: &StepVector) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        for (slot, value) in self.steps.iter().zip(steps.iter()) {
            slot.store(*value, Ordering::Relaxed);
        }
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Add a step delta to every axis, clamped to the counter range. Single writer only.
    pub fn advance(&self, delta: &StepVector) {
        let mut next = self.snapshot();
        for (pos, d) in next.iter_mut().zip(delta.iter()) {
            *pos = pos.saturating_add(*d);
        }
        self.publish(&next);
    }

    /// Zero every axis.
    pub fn clear(&self) {
        self.publish(&[0; MAX_N_AXIS]);
    }

    /// Consistent copy of all axes.
    pub fn snapshot(&self) -> StepVector {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let mut out = [0i32; MAX_N_AXIS];
            for (dst, slot) in out.iter_mut().zip(self.steps.iter()) {
                *dst = slot.load(Ordering::Relaxed);
            }
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return out;
            }
            std::hint::spin_loop();
        }
    }

    /// Number of completed writes.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.seq.load(Ordering::Acquire) / 2
    }
}

impl Default for SharedPosition {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a step vector to machine units.
pub fn steps_to_mpos(steps: &StepVector, steps_per_mm: &AxisVector) -> AxisVector {
    let mut out = [0.0f32; MAX_N_AXIS];
    for axis in 0..MAX_N_AXIS {
        if steps_per_mm[axis] > 0.0 {
            out[axis] = steps[axis] as f32 / steps_per_mm[axis];
        }
    }
    out
}

/// Convert machine units to the nearest step vector.
///
/// Positions beyond the counter range clamp to `i32::MIN`/`i32::MAX`.
pub fn mpos_to_steps(mpos: &AxisVector, steps_per_mm: &AxisVector) -> StepVector {
    let mut out = [0i32; MAX_N_AXIS];
    for axis in 0..MAX_N_AXIS {
        out[axis] = (mpos[axis] * steps_per_mm[axis]).round() as i32;
    }
    out
}
