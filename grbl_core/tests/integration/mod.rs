//! Shared fixtures for the integration scenarios.

mod backlash;
mod boot;
mod probe;
mod session_restart;

use grbl_common::config::{AxisConfig, MachineConfig, SpindleKind};
use grbl_common::consts::AXIS_LETTERS;
use grbl_common::motion::{AxisVector, ZERO_VECTOR};
use grbl_core::lifecycle::{BootPolicy, Controller, Session, SessionExit};
use grbl_core::settings::FileSettings;
use grbl_core::sim::SimMachine;

/// Fine resolution so lash amounts map to whole steps.
pub const STEPS_PER_MM: f32 = 1000.0;

/// Machine with one axis per entry of `backlash`.
pub fn machine_config(backlash: &[f32]) -> MachineConfig {
    MachineConfig {
        axes: backlash
            .iter()
            .zip(AXIS_LETTERS.iter())
            .map(|(amount, letter)| AxisConfig {
                name: letter.to_string(),
                steps_per_mm: STEPS_PER_MM,
                backlash: *amount,
            })
            .collect(),
        ..MachineConfig::default()
    }
}

pub fn homing_config(backlash: &[f32]) -> MachineConfig {
    let mut config = machine_config(backlash);
    config.homing.enable = true;
    config
}

pub fn with_spindle(mut config: MachineConfig, kind: SpindleKind) -> MachineConfig {
    config.spindle.kind = kind;
    config
}

pub fn homing_lock() -> BootPolicy {
    BootPolicy {
        force_init_alarm: false,
        homing_init_lock: true,
    }
}

/// Simulated machine and an uninitialized controller.
pub fn build(config: MachineConfig, policy: BootPolicy) -> (SimMachine, Controller) {
    let sim = SimMachine::new();
    let subsystems = sim.subsystems(Box::new(FileSettings::from_config(config)));
    let controller = Controller::new(subsystems, sim.position(), policy);
    (sim, controller)
}

/// Simulated machine and a cold-initialized controller.
pub fn booted(config: MachineConfig, policy: BootPolicy) -> (SimMachine, Controller) {
    let (sim, mut controller) = build(config, policy);
    controller.cold_init().unwrap();
    (sim, controller)
}

/// Pin a closure to the protocol signature.
pub fn session_fn<F>(f: F) -> F
where
    F: FnMut(&mut Session<'_>) -> SessionExit,
{
    f
}

pub fn at(axis: usize, value: f32) -> AxisVector {
    let mut v = ZERO_VECTOR;
    v[axis] = value;
    v
}

pub fn xy(x: f32, y: f32) -> AxisVector {
    let mut v = ZERO_VECTOR;
    v[0] = x;
    v[1] = y;
    v
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
