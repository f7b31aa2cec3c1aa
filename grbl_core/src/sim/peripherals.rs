//! Thin collaborator handles over the shared [`SimCore`].

use std::cell::RefCell;
use std::rc::Rc;

use grbl_common::config::SpindleKind;
use grbl_common::consts::MAX_N_AXIS;
use grbl_common::motion::{AxisVector, PlanLineData};
use grbl_common::state::SystemState;

use super::SimCore;
use crate::collaborators::{
    Client, Coolant, GcodeParser, Limits, MachineHooks, MotorDrivers, Planner, Probe, Reporter,
    Settings, Spindle, Stepper, SystemPins,
};
use crate::error::{Subsystem, SubsystemError};
use crate::report::{feedback_line, init_lines, status_line};

type Core = Rc<RefCell<SimCore>>;

macro_rules! sim_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name {
            core: Core,
        }

        impl $name {
            pub fn new(core: Core) -> Self {
                Self { core }
            }
        }
    };
}

sim_handle!(
    /// Serial transport stand-in.
    SimClient
);
sim_handle!(SimStepper);
sim_handle!(SimSystemPins);
sim_handle!(SimMotors);
sim_handle!(
    /// Planner block buffer backed by the core's queue.
    SimPlanner
);
sim_handle!(SimGcode);
sim_handle!(SimProbe);
sim_handle!(SimCoolant);
sim_handle!(SimLimits);
sim_handle!(
    /// Collects operator messages in the core.
    SimReporter
);
sim_handle!(
    /// Display and machine hooks that record their calls.
    SimHooks
);

impl Client for SimClient {
    fn init(&mut self) -> Result<(), SubsystemError> {
        self.core.borrow_mut().start(Subsystem::Client, "client.init")
    }

    fn reset_read_buffer(&mut self) {
        self.core.borrow_mut().record("client.reset_read_buffer");
    }

    fn begin_input(&mut self) {
        self.core.borrow_mut().record("client.begin_input");
    }
}

impl Stepper for SimStepper {
    fn init(&mut self) -> Result<(), SubsystemError> {
        self.core.borrow_mut().start(Subsystem::Stepper, "stepper.init")
    }

    fn reset(&mut self) {
        let mut core = self.core.borrow_mut();
        core.record("stepper.reset");
        core.reset_stepper();
    }

    fn executed_backlash_travel(&mut self) -> AxisVector {
        self.core.borrow_mut().take_backlash_travel()
    }
}

impl SystemPins for SimSystemPins {
    fn init(&mut self) -> Result<(), SubsystemError> {
        self.core
            .borrow_mut()
            .start(Subsystem::SystemPins, "system_pins.init")
    }
}

impl MotorDrivers for SimMotors {
    fn init(&mut self) -> Result<(), SubsystemError> {
        self.core
            .borrow_mut()
            .start(Subsystem::MotorDrivers, "motors.init")
    }
}

impl Planner for SimPlanner {
    fn enqueue(&mut self, target: &AxisVector, data: &PlanLineData) -> bool {
        self.core.borrow_mut().enqueue(target, data)
    }

    fn reset(&mut self) {
        let mut core = self.core.borrow_mut();
        core.record("planner.reset");
        core.reset_planner();
    }

    fn sync_position(&mut self, machine_position: &AxisVector) {
        let mut core = self.core.borrow_mut();
        core.record("planner.sync_position");
        core.sync_planner(machine_position);
    }
}

impl GcodeParser for SimGcode {
    fn init(&mut self) {
        self.core.borrow_mut().record("gcode.init");
    }

    fn sync_position(&mut self, machine_position: &AxisVector) {
        let mut core = self.core.borrow_mut();
        core.record("gcode.sync_position");
        core.set_parser_position(machine_position);
    }
}

impl Probe for SimProbe {
    fn init(&mut self) {
        self.core.borrow_mut().record("probe.init");
    }

    fn set_triggered(&mut self, triggered: bool) {
        let mut core = self.core.borrow_mut();
        core.record("probe.set_triggered");
        core.set_probe_triggered(triggered);
    }
}

impl Coolant for SimCoolant {
    fn init(&mut self) {
        self.core.borrow_mut().record("coolant.init");
    }
}

impl Limits for SimLimits {
    fn init(&mut self) {
        self.core.borrow_mut().record("limits.init");
    }
}

impl Reporter for SimReporter {
    fn init_message(&mut self, state: SystemState) {
        let mut core = self.core.borrow_mut();
        core.record("reporter.init_message");
        for line in init_lines(state) {
            core.push_message(line);
        }
    }

    fn status(&mut self, state: SystemState, machine_position: &AxisVector) {
        let line = status_line(state, machine_position, MAX_N_AXIS);
        self.core.borrow_mut().push_message(line);
    }

    fn feedback(&mut self, message: &str) {
        self.core.borrow_mut().push_message(feedback_line(message));
    }
}

impl MachineHooks for SimHooks {
    fn display_init(&mut self) -> Result<(), SubsystemError> {
        self.core
            .borrow_mut()
            .start(Subsystem::Display, "hooks.display_init")
    }

    fn machine_init(&mut self) -> Result<(), SubsystemError> {
        self.core
            .borrow_mut()
            .start(Subsystem::Machine, "hooks.machine_init")
    }
}

/// Settings wrapper that records the load and shares step resolution with
/// the simulated planner.
pub struct SimSettings {
    core: Core,
    inner: Box<dyn Settings>,
}

impl SimSettings {
    pub fn new(core: Core, inner: Box<dyn Settings>) -> Self {
        Self { core, inner }
    }
}

impl Settings for SimSettings {
    fn init(&mut self) -> Result<(), SubsystemError> {
        self.core
            .borrow_mut()
            .start(Subsystem::Settings, "settings.init")?;
        self.inner.init()?;
        self.core
            .borrow_mut()
            .set_steps_per_mm(self.inner.steps_per_mm());
        Ok(())
    }

    fn axis_count(&self) -> usize {
        self.inner.axis_count()
    }

    fn backlash_amount(&self, axis: usize) -> f32 {
        self.inner.backlash_amount(axis)
    }

    fn steps_per_mm(&self) -> AxisVector {
        self.inner.steps_per_mm()
    }

    fn homing_enabled(&self) -> bool {
        self.inner.homing_enabled()
    }

    fn spindle_kind(&self) -> SpindleKind {
        self.inner.spindle_kind()
    }
}

/// Simulated spindle output.
pub struct SimSpindle {
    core: Core,
    name: &'static str,
}

impl SimSpindle {
    pub fn new(core: Core, name: &'static str) -> Self {
        Self { core, name }
    }
}

impl Spindle for SimSpindle {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&mut self) -> Result<(), SubsystemError> {
        self.core.borrow_mut().start(Subsystem::Spindle, "spindle.init")
    }

    fn stop(&mut self) {
        self.core.borrow_mut().record("spindle.stop");
    }
}
