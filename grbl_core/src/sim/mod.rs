//! Simulated machine for development and testing without hardware.
//!
//! [`SimMachine`] implements every collaborator the lifecycle controller
//! drives. All handles share one [`SimCore`] that models the planner block
//! buffer, the stepper executing it, and the machine position it publishes.
//! Calls are recorded in order and any fallible subsystem can be made to
//! fail on demand.

mod peripherals;

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use grbl_common::config::SpindleKind;
use grbl_common::consts::{BLOCK_BUFFER_SIZE, DEFAULT_STEPS_PER_MM, MAX_N_AXIS};
use grbl_common::motion::{AxisVector, PlanLineData, StepVector, ZERO_VECTOR};
use grbl_common::position::{SharedPosition, mpos_to_steps, steps_to_mpos};
use heapless::Deque;
use tracing::{debug, trace};

use crate::collaborators::{MachineHooks, Settings, Spindle};
use crate::error::{Subsystem, SubsystemError};
use crate::lifecycle::Subsystems;
use crate::spindle::SpindleRegistry;

pub use peripherals::{
    SimClient, SimCoolant, SimGcode, SimHooks, SimLimits, SimMotors, SimPlanner, SimProbe,
    SimReporter, SimSettings, SimSpindle, SimStepper, SimSystemPins,
};

/// One queued planner block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimBlock {
    /// Logical target [mm].
    pub target: AxisVector,
    /// Step delta the stepper will execute.
    pub steps: StepVector,
    pub data: PlanLineData,
}

/// Shared state behind every simulated collaborator.
#[derive(Debug)]
pub struct SimCore {
    position: Arc<SharedPosition>,
    steps_per_mm: AxisVector,
    queue: Deque<SimBlock, BLOCK_BUFFER_SIZE>,
    /// Planner position. Not advanced by backlash blocks.
    planner_position: StepVector,
    backlash_travel: AxisVector,
    parser_position: AxisVector,
    probe_triggered: bool,
    calls: Vec<&'static str>,
    failures: HashMap<Subsystem, String>,
    messages: Vec<String>,
    planned: Vec<SimBlock>,
}

impl SimCore {
    fn new(position: Arc<SharedPosition>) -> Self {
        Self {
            position,
            steps_per_mm: [DEFAULT_STEPS_PER_MM; MAX_N_AXIS],
            queue: Deque::new(),
            planner_position: [0; MAX_N_AXIS],
            backlash_travel: ZERO_VECTOR,
            parser_position: ZERO_VECTOR,
            probe_triggered: false,
            calls: Vec::new(),
            failures: HashMap::new(),
            messages: Vec::new(),
            planned: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, call: &'static str) {
        trace!("sim: {call}");
        self.calls.push(call);
    }

    /// Record `call` and return the injected failure for `subsystem`, if any.
    pub(crate) fn start(
        &mut self,
        subsystem: Subsystem,
        call: &'static str,
    ) -> Result<(), SubsystemError> {
        self.record(call);
        match self.failures.get(&subsystem) {
            Some(reason) => Err(SubsystemError::HardwareUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    pub(crate) fn set_steps_per_mm(&mut self, steps_per_mm: AxisVector) {
        self.steps_per_mm = steps_per_mm;
    }

    pub(crate) fn enqueue(&mut self, target: &AxisVector, data: &PlanLineData) -> bool {
        let target_steps = mpos_to_steps(target, &self.steps_per_mm);
        let mut steps = [0i32; MAX_N_AXIS];
        for (axis, delta) in steps.iter_mut().enumerate() {
            *delta = target_steps[axis].saturating_sub(self.planner_position[axis]);
        }
        if steps.iter().all(|d| *d == 0) {
            return false;
        }
        if !data.is_backlash_motion() {
            self.planner_position = target_steps;
        }

        let block = SimBlock {
            target: *target,
            steps,
            data: *data,
        };
        if self.queue.is_full() {
            // Stepper drains the oldest block to make room.
            self.execute_next();
        }
        if self.queue.push_back(block).is_err() {
            return false;
        }
        self.planned.push(block);
        true
    }

    pub(crate) fn reset_planner(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn sync_planner(&mut self, machine_position: &AxisVector) {
        self.planner_position = mpos_to_steps(machine_position, &self.steps_per_mm);
    }

    pub(crate) fn reset_stepper(&mut self) {
        self.backlash_travel = ZERO_VECTOR;
    }

    pub(crate) fn take_backlash_travel(&mut self) -> AxisVector {
        std::mem::replace(&mut self.backlash_travel, ZERO_VECTOR)
    }

    pub(crate) fn set_parser_position(&mut self, machine_position: &AxisVector) {
        self.parser_position = *machine_position;
    }

    pub(crate) fn set_probe_triggered(&mut self, triggered: bool) {
        self.probe_triggered = triggered;
    }

    pub(crate) fn push_message(&mut self, line: String) {
        self.messages.push(line);
    }

    fn execute_next(&mut self) -> bool {
        let Some(block) = self.queue.pop_front() else {
            return false;
        };
        self.position.advance(&block.steps);
        if block.data.is_backlash_motion() {
            for axis in 0..MAX_N_AXIS {
                if self.steps_per_mm[axis] > 0.0 {
                    self.backlash_travel[axis] +=
                        block.steps[axis].unsigned_abs() as f32 / self.steps_per_mm[axis];
                }
            }
        }
        debug!("sim: executed block to {:?}", block.target);
        true
    }
}

/// Handle to a simulated machine.
///
/// Cloning yields another handle to the same machine.
#[derive(Debug, Clone)]
pub struct SimMachine {
    core: Rc<RefCell<SimCore>>,
    position: Arc<SharedPosition>,
}

impl SimMachine {
    pub fn new() -> Self {
        let position = Arc::new(SharedPosition::new());
        Self {
            core: Rc::new(RefCell::new(SimCore::new(Arc::clone(&position)))),
            position,
        }
    }

    /// Machine position shared with the controller.
    pub fn position(&self) -> Arc<SharedPosition> {
        Arc::clone(&self.position)
    }

    /// Make every init of `subsystem` fail from now on.
    pub fn fail(&self, subsystem: Subsystem, reason: &str) {
        self.core
            .borrow_mut()
            .failures
            .insert(subsystem, reason.to_string());
    }

    /// Build the full collaborator set around `settings`.
    pub fn subsystems(&self, settings: Box<dyn Settings>) -> Subsystems {
        self.subsystems_with_hooks(settings, Box::new(SimHooks::new(self.core())))
    }

    /// Like [`SimMachine::subsystems`] with custom machine hooks.
    pub fn subsystems_with_hooks(
        &self,
        settings: Box<dyn Settings>,
        hooks: Box<dyn MachineHooks>,
    ) -> Subsystems {
        let core = self.core();
        Subsystems {
            client: Box::new(SimClient::new(core.clone())),
            settings: Box::new(SimSettings::new(core.clone(), settings)),
            stepper: Box::new(SimStepper::new(core.clone())),
            system_pins: Box::new(SimSystemPins::new(core.clone())),
            motors: Box::new(SimMotors::new(core.clone())),
            planner: Box::new(SimPlanner::new(core.clone())),
            gcode: Box::new(SimGcode::new(core.clone())),
            probe: Box::new(SimProbe::new(core.clone())),
            coolant: Box::new(SimCoolant::new(core.clone())),
            limits: Box::new(SimLimits::new(core.clone())),
            reporter: Box::new(SimReporter::new(core.clone())),
            hooks,
            spindles: self.spindle_registry(),
        }
    }

    /// Registry with a simulated driver for every spindle kind.
    pub fn spindle_registry(&self) -> SpindleRegistry {
        let mut registry = SpindleRegistry::new();
        for (kind, name) in [
            (SpindleKind::Relay, "Relay"),
            (SpindleKind::Pwm, "PWM"),
            (SpindleKind::Laser, "Laser"),
        ] {
            let core = self.core();
            registry.register(
                kind,
                Box::new(move || -> Box<dyn Spindle> {
                    Box::new(SimSpindle::new(core.clone(), name))
                }),
            );
        }
        registry
    }

    /// Execute every queued block.
    pub fn execute_all(&self) -> usize {
        let mut core = self.core.borrow_mut();
        let mut executed = 0;
        while core.execute_next() {
            executed += 1;
        }
        executed
    }

    /// Stop on probe contact at `machine_position`.
    ///
    /// The stepper publishes the contact point and raises the probe flag.
    /// Queued motion stays queued until the planner is reset.
    pub fn probe_contact(&self, machine_position: &AxisVector) {
        let mut core = self.core.borrow_mut();
        let steps = mpos_to_steps(machine_position, &core.steps_per_mm);
        core.position.publish(&steps);
        core.probe_triggered = true;
    }

    /// Physical machine position [mm].
    pub fn machine_position(&self) -> AxisVector {
        let core = self.core.borrow();
        steps_to_mpos(&self.position.snapshot(), &core.steps_per_mm)
    }

    /// Collaborator calls in the order they happened.
    pub fn calls(&self) -> Vec<&'static str> {
        self.core.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.core.borrow_mut().calls.clear();
    }

    /// Every block the planner accepted, in order.
    pub fn planned(&self) -> Vec<SimBlock> {
        self.core.borrow().planned.clone()
    }

    pub fn queued(&self) -> usize {
        self.core.borrow().queue.len()
    }

    /// Messages the reporter emitted.
    pub fn messages(&self) -> Vec<String> {
        self.core.borrow().messages.clone()
    }

    pub fn parser_position(&self) -> AxisVector {
        self.core.borrow().parser_position
    }

    pub fn probe_triggered(&self) -> bool {
        self.core.borrow().probe_triggered
    }

    /// Read-only view of the shared core.
    pub fn inspect(&self) -> Ref<'_, SimCore> {
        self.core.borrow()
    }

    fn core(&self) -> Rc<RefCell<SimCore>> {
        Rc::clone(&self.core)
    }
}

impl Default for SimMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimCore {
    /// Planner position [steps].
    pub fn planner_position(&self) -> StepVector {
        self.planner_position
    }

    /// Executed backlash travel not yet collected [mm].
    pub fn pending_backlash_travel(&self) -> AxisVector {
        self.backlash_travel
    }
}
