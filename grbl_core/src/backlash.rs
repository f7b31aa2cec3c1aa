//! Backlash compensation engine.
//!
//! Tracks the last travel direction of every axis. When an axis reverses,
//! a take-up segment of the configured lash is emitted ahead of the commanded
//! move so the tool reaches the nominal target net of slack.
//!
//! ## Per-Axis State
//!
//! | Field | Neutral | Meaning |
//! |-------|---------|---------|
//! | `direction` | `Unknown` | Last non-zero travel direction |
//! | `remaining` | `0.0` | Take-up not yet executed [mm, magnitude] |
//! | `previous_target` | machine position | Last commanded logical position |
//! | `mpos_offset` | `0.0` | Lash injected into the motor position |
//!
//! `0 <= remaining <= amount` and `|mpos_offset| <= amount` hold at all times.
//!
//! All state is foreground-only. `compensate()` runs before a move reaches
//! the planner and never blocks.

use grbl_common::consts::{AXIS_LETTERS, MAX_N_AXIS};
use grbl_common::motion::{AxisVector, MotionFlags, PlanLineData, ZERO_VECTOR};
use grbl_common::state::Direction;
use tracing::{debug, warn};

use crate::collaborators::Settings;

/// Remaining take-up below this is treated as consumed [mm].
const CONSUMED_EPSILON: f32 = 1e-6;

// ─── Backlash Store ─────────────────────────────────────────────────

/// Configured lash per axis [mm]. Loaded once per settings load.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BacklashStore {
    amounts: AxisVector,
}

impl BacklashStore {
    /// Read every configured axis from the settings collaborator.
    pub fn load(settings: &dyn Settings) -> Self {
        let count = settings.axis_count().min(MAX_N_AXIS);
        let mut amounts = ZERO_VECTOR;
        for (axis, slot) in amounts.iter_mut().enumerate().take(count) {
            *slot = sanitize(axis, settings.backlash_amount(axis));
        }
        Self { amounts }
    }

    /// Build from explicit amounts. Extra entries beyond `MAX_N_AXIS` are ignored.
    pub fn from_amounts(values: &[f32]) -> Self {
        let mut amounts = ZERO_VECTOR;
        for (axis, (slot, value)) in amounts.iter_mut().zip(values.iter()).enumerate() {
            *slot = sanitize(axis, *value);
        }
        Self { amounts }
    }

    /// Lash of `axis` [mm].
    #[inline]
    pub fn amount(&self, axis: usize) -> f32 {
        self.amounts.get(axis).copied().unwrap_or(0.0)
    }

    /// True when no axis has lash configured.
    pub fn is_disabled(&self) -> bool {
        self.amounts.iter().all(|a| *a == 0.0)
    }
}

/// Values are trusted, but never negative.
fn sanitize(axis: usize, value: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(
            "backlash for axis {} is {value}, using 0",
            AXIS_LETTERS[axis.min(MAX_N_AXIS - 1)]
        );
        0.0
    }
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Per-axis direction and take-up bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisLash {
    pub direction: Direction,
    pub remaining: f32,
    pub previous_target: f32,
    pub mpos_offset: f32,
}

impl AxisLash {
    fn neutral(position: f32) -> Self {
        Self {
            previous_target: position,
            ..Self::default()
        }
    }
}

/// Take-up segment to enqueue before the nominal move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectiveSegment {
    /// Target in planner coordinates. Only reversing axes move.
    pub target: AxisVector,
    /// Caller's metadata, classified as rapid backlash motion.
    pub data: PlanLineData,
}

/// Result of [`BacklashEngine::compensate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensatedMove {
    /// Take-up segment, present when at least one axis reversed.
    pub correction: Option<CorrectiveSegment>,
    /// Nominal target, unchanged.
    pub target: AxisVector,
}

/// Backlash compensation engine.
#[derive(Debug, Clone)]
pub struct BacklashEngine {
    store: BacklashStore,
    axes: [AxisLash; MAX_N_AXIS],
    corrections: u64,
}

impl BacklashEngine {
    /// Engine with no lash configured and neutral state.
    pub fn new() -> Self {
        Self::with_store(BacklashStore::default())
    }

    /// Engine with the given amounts and neutral state at the origin.
    pub fn with_store(store: BacklashStore) -> Self {
        Self {
            store,
            axes: [AxisLash::default(); MAX_N_AXIS],
            corrections: 0,
        }
    }

    /// Load lash amounts and neutralize every axis at the origin.
    ///
    /// Called once during cold init, after settings load and before any
    /// move can be queued.
    pub fn initialize(&mut self, settings: &dyn Settings) {
        self.store = BacklashStore::load(settings);
        self.axes = [AxisLash::default(); MAX_N_AXIS];
        self.corrections = 0;
        debug!("backlash engine initialized: {:?}", self.store.amounts);
    }

    /// Adjust a commanded move for direction reversals.
    ///
    /// For every axis that moves, a reversal against a known previous
    /// direction with non-zero lash adds `amount` of take-up in the new
    /// direction. Zero-length axes keep their direction.
    pub fn compensate(&mut self, target: &AxisVector, data: &PlanLineData) -> CompensatedMove {
        let mut correction_target = ZERO_VECTOR;
        let mut reversed = false;

        for axis in 0..MAX_N_AXIS {
            let amount = self.store.amount(axis);
            let lash = &mut self.axes[axis];
            correction_target[axis] = lash.previous_target;

            let Some(dir) = Direction::of_travel(lash.previous_target, target[axis]) else {
                continue;
            };

            if amount > 0.0 && lash.direction.reverses(dir) {
                let take_up = dir.sign() * amount;
                correction_target[axis] = lash.previous_target + take_up;
                lash.remaining = amount;
                lash.mpos_offset += take_up;
                reversed = true;
                debug!(
                    "axis {} reversed to {dir:?}, take-up {take_up}",
                    AXIS_LETTERS[axis]
                );
            }

            lash.direction = dir;
            lash.previous_target = target[axis];
        }

        let correction = reversed.then(|| {
            self.corrections += 1;
            let mut corrective = *data;
            corrective.motion |= MotionFlags::RAPID_MOTION | MotionFlags::BACKLASH_MOTION;
            CorrectiveSegment {
                target: correction_target,
                data: corrective,
            }
        });

        CompensatedMove {
            correction,
            target: *target,
        }
    }

    /// Reduce outstanding take-up by the travel the stepper executed.
    pub fn consume_correction(&mut self, executed: &AxisVector) {
        for (lash, travel) in self.axes.iter_mut().zip(executed.iter()) {
            if lash.remaining == 0.0 {
                continue;
            }
            let left = (lash.remaining - travel.abs()).max(0.0);
            lash.remaining = if left < CONSUMED_EPSILON { 0.0 } else { left };
        }
    }

    /// Neutralize every axis and re-seed commanded positions.
    ///
    /// Called by warm reset and whenever the planner position is forcibly
    /// resynchronized. Idempotent.
    pub fn reset_targets(&mut self, machine_position: &AxisVector) {
        for (lash, position) in self.axes.iter_mut().zip(machine_position.iter()) {
            *lash = AxisLash::neutral(*position);
        }
    }

    /// Discard direction memory after a probe-triggered stop.
    ///
    /// The stop point is authoritative; whichever side of the lash the
    /// mechanism rests on is unknown.
    pub fn synch_position_while_using_probe(&mut self, machine_position: &AxisVector) {
        self.reset_targets(machine_position);
        debug!("backlash state discarded after probe stop");
    }

    /// Lash amounts in use.
    #[inline]
    pub fn store(&self) -> &BacklashStore {
        &self.store
    }

    /// State of one axis.
    #[inline]
    pub fn axis(&self, axis: usize) -> &AxisLash {
        &self.axes[axis]
    }

    /// Last travel direction of `axis`.
    #[inline]
    pub fn last_direction(&self, axis: usize) -> Direction {
        self.axes[axis].direction
    }

    /// Outstanding take-up of `axis` [mm]. The side is `last_direction`.
    #[inline]
    pub fn compensation_remaining(&self, axis: usize) -> f32 {
        self.axes[axis].remaining
    }

    /// True while any take-up is still outstanding.
    pub fn correction_pending(&self) -> bool {
        self.axes.iter().any(|a| a.remaining != 0.0)
    }

    /// Last commanded logical position of every axis.
    pub fn commanded_position(&self) -> AxisVector {
        let mut out = ZERO_VECTOR;
        for (dst, lash) in out.iter_mut().zip(self.axes.iter()) {
            *dst = lash.previous_target;
        }
        out
    }

    /// Lash currently folded into the motor position, per axis.
    pub fn mpos_offset(&self) -> AxisVector {
        let mut out = ZERO_VECTOR;
        for (dst, lash) in out.iter_mut().zip(self.axes.iter()) {
            *dst = lash.mpos_offset;
        }
        out
    }

    /// Number of take-up segments emitted since init.
    #[inline]
    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    /// True when every axis is in the neutral state.
    pub fn is_neutral(&self) -> bool {
        self.axes
            .iter()
            .all(|a| a.direction == Direction::Unknown && a.remaining == 0.0 && a.mpos_offset == 0.0)
    }
}

impl Default for BacklashEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
