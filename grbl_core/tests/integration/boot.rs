//! Cold init ordering, boot state policy and fatal failures.

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use grbl_common::config::{ConfigError, SpindleKind};
use grbl_common::state::{Direction, SystemState};
use grbl_core::collaborators::MachineHooks;
use grbl_core::error::{InitError, Subsystem, SubsystemError};
use grbl_core::lifecycle::{BootPolicy, Controller, SessionExit};
use grbl_core::settings::FileSettings;
use grbl_core::sim::SimMachine;
use grbl_core::spindle::SpindleRegistry;
use grbl_core::supervisor::Supervisor;

use super::*;

#[test]
fn homing_lock_boots_into_alarm() {
    let (_sim, controller) = booted(homing_config(&[0.05]), homing_lock());
    assert_eq!(controller.state().state, SystemState::Alarm);
    assert!(!controller.state().homing_completed);
}

#[test]
fn without_homing_lock_boots_idle() {
    let (_sim, controller) = booted(homing_config(&[0.05]), BootPolicy::default());
    assert_eq!(controller.state().state, SystemState::Idle);
}

#[test]
fn homing_lock_ignored_when_homing_disabled() {
    let (_sim, controller) = booted(machine_config(&[0.05]), homing_lock());
    assert_eq!(controller.state().state, SystemState::Idle);
}

#[test]
fn forced_alarm_policy() {
    let policy = BootPolicy {
        force_init_alarm: true,
        homing_init_lock: false,
    };
    let (_sim, controller) = booted(machine_config(&[0.0]), policy);
    assert_eq!(controller.state().state, SystemState::Alarm);
}

#[test]
fn alarm_boot_reports_unlock_hint() {
    let (sim, mut controller) = booted(homing_config(&[0.0]), homing_lock());
    let mut protocol = session_fn(|_| SessionExit::Shutdown);
    controller.run_once(&mut protocol).unwrap();
    let messages = sim.messages();
    assert!(messages[0].starts_with("Grbl "));
    assert_eq!(messages[1], "[MSG:'$H'|'$X' to unlock]");
}

#[test]
fn cold_init_runs_in_dependency_order() {
    let config = with_spindle(machine_config(&[0.05, 0.02]), SpindleKind::Pwm);
    let (sim, controller) = booted(config, BootPolicy::default());

    assert_eq!(
        sim.calls(),
        vec![
            "client.init",
            "hooks.display_init",
            "settings.init",
            "stepper.init",
            "system_pins.init",
            "motors.init",
            "hooks.machine_init",
            "spindle.init",
            "client.begin_input",
        ]
    );
    assert_eq!(controller.spindle_name(), Some("PWM"));
    assert!(controller.is_initialized());
}

#[test]
fn engine_is_loaded_from_settings_and_neutral() {
    let (_sim, controller) = booted(machine_config(&[0.05, 0.0, 0.1]), BootPolicy::default());
    let engine = controller.engine();
    assert!(approx(engine.store().amount(0), 0.05));
    assert_eq!(engine.store().amount(1), 0.0);
    assert!(approx(engine.store().amount(2), 0.1));
    assert!(engine.is_neutral());
    for axis in 0..3 {
        assert_eq!(engine.last_direction(axis), Direction::Unknown);
        assert_eq!(engine.compensation_remaining(axis), 0.0);
    }
}

#[test]
fn cold_init_zeroes_machine_position() {
    let (sim, mut controller) = build(machine_config(&[0.0]), BootPolicy::default());
    sim.position().publish(&[123, -4, 0, 0, 0, 0]);
    controller.cold_init().unwrap();
    assert_eq!(sim.position().snapshot(), [0; 6]);
    assert_eq!(controller.machine_position()[0], 0.0);
}

#[test]
fn second_cold_init_is_rejected() {
    let (sim, mut controller) = booted(machine_config(&[0.0]), BootPolicy::default());
    sim.clear_calls();
    assert!(matches!(
        controller.cold_init(),
        Err(InitError::AlreadyInitialized)
    ));
    assert!(sim.calls().is_empty());
}

#[test]
fn session_before_cold_init_is_rejected() {
    let (_sim, mut controller) = build(machine_config(&[0.0]), BootPolicy::default());
    let mut entered = false;
    let mut protocol = session_fn(|_| {
        entered = true;
        SessionExit::Shutdown
    });
    assert!(matches!(
        controller.run_once(&mut protocol),
        Err(InitError::NotInitialized)
    ));
    drop(protocol);
    assert!(!entered);
}

#[test]
fn subsystem_failure_is_fatal() {
    let (sim, mut controller) = build(machine_config(&[0.0]), BootPolicy::default());
    sim.fail(Subsystem::Stepper, "step timer busy");

    let err = controller.cold_init().unwrap_err();
    match err {
        InitError::Subsystem { subsystem, source } => {
            assert_eq!(subsystem, Subsystem::Stepper);
            assert!(matches!(source, SubsystemError::HardwareUnavailable(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sim.calls().last(), Some(&"stepper.init"));
    assert!(!sim.calls().contains(&"system_pins.init"));
    assert!(!controller.is_initialized());
}

#[test]
fn supervisor_never_enters_loop_after_fatal_init() {
    let (sim, mut controller) = build(machine_config(&[0.0]), BootPolicy::default());
    sim.fail(Subsystem::MotorDrivers, "driver fault");

    let mut sessions = 0;
    let mut protocol = session_fn(|_| {
        sessions += 1;
        SessionExit::Shutdown
    });
    let result = Supervisor::new().run(&mut controller, &mut protocol);
    drop(protocol);

    assert!(matches!(
        result,
        Err(InitError::Subsystem {
            subsystem: Subsystem::MotorDrivers,
            ..
        })
    ));
    assert_eq!(sessions, 0);
    assert!(!sim.calls().contains(&"client.begin_input"));
}

#[test]
fn malformed_settings_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[[axes]]\nname = \"X\"\nbacklash = \"lots\"").unwrap();

    let sim = SimMachine::new();
    let subsystems = sim.subsystems(Box::new(FileSettings::new(file.path())));
    let mut controller = Controller::new(subsystems, sim.position(), BootPolicy::default());

    match controller.cold_init() {
        Err(InitError::Subsystem {
            subsystem: Subsystem::Settings,
            source: SubsystemError::Settings(ConfigError::ParseError(_)),
        }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn negative_backlash_is_rejected_by_settings() {
    let (sim, mut controller) = build(machine_config(&[-0.1]), BootPolicy::default());
    let err = controller.cold_init().unwrap_err();
    assert!(matches!(
        err,
        InitError::Subsystem {
            subsystem: Subsystem::Settings,
            source: SubsystemError::Settings(ConfigError::ValidationError(_)),
        }
    ));
    assert!(!sim.calls().contains(&"stepper.init"));
}

#[test]
fn missing_settings_file_boots_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let sim = SimMachine::new();
    let subsystems = sim.subsystems(Box::new(FileSettings::new(dir.path().join("none.toml"))));
    let mut controller = Controller::new(subsystems, sim.position(), homing_lock());

    controller.cold_init().unwrap();
    assert_eq!(controller.state().state, SystemState::Idle);
    assert!(controller.engine().store().is_disabled());
    assert_eq!(controller.spindle_name(), Some("None"));
}

#[test]
fn unregistered_spindle_is_fatal() {
    let sim = SimMachine::new();
    let config = with_spindle(machine_config(&[0.0]), SpindleKind::Laser);
    let mut subsystems = sim.subsystems(Box::new(FileSettings::from_config(config)));
    subsystems.spindles = SpindleRegistry::new();
    let mut controller = Controller::new(subsystems, sim.position(), BootPolicy::default());

    assert!(matches!(
        controller.cold_init(),
        Err(InitError::SpindleNotFound(SpindleKind::Laser))
    ));
}

struct CountingHooks {
    display: Rc<Cell<u32>>,
}

impl MachineHooks for CountingHooks {
    fn display_init(&mut self) -> Result<(), SubsystemError> {
        self.display.set(self.display.get() + 1);
        Ok(())
    }
}

#[test]
fn custom_hooks_replace_defaults() {
    let display = Rc::new(Cell::new(0));
    let sim = SimMachine::new();
    let subsystems = sim.subsystems_with_hooks(
        Box::new(FileSettings::from_config(machine_config(&[0.0]))),
        Box::new(CountingHooks {
            display: Rc::clone(&display),
        }),
    );
    let mut controller = Controller::new(subsystems, sim.position(), BootPolicy::default());
    controller.cold_init().unwrap();

    assert_eq!(display.get(), 1);
    assert!(!sim.calls().contains(&"hooks.display_init"));
}
