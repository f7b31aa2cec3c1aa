//! Warm reset ordering and state preservation across aborted sessions.

use grbl_common::motion::PlanLineData;
use grbl_common::state::{Direction, SystemState};
use grbl_core::lifecycle::{BootPolicy, SessionExit};
use grbl_core::supervisor::Supervisor;

use super::*;

#[test]
fn warm_reset_runs_in_order() {
    let (sim, mut controller) = booted(machine_config(&[0.05]), BootPolicy::default());
    sim.clear_calls();

    let mut protocol = session_fn(|_| SessionExit::Shutdown);
    controller.run_once(&mut protocol).unwrap();

    assert_eq!(
        sim.calls(),
        vec![
            "probe.set_triggered",
            "client.reset_read_buffer",
            "gcode.init",
            "coolant.init",
            "limits.init",
            "probe.init",
            "planner.reset",
            "stepper.reset",
            "planner.sync_position",
            "gcode.sync_position",
            "reporter.init_message",
        ]
    );
}

#[test]
fn warm_reset_stops_active_spindle() {
    let config = with_spindle(machine_config(&[0.0]), grbl_common::config::SpindleKind::Relay);
    let (sim, mut controller) = booted(config, BootPolicy::default());
    sim.clear_calls();

    let mut protocol = session_fn(|_| SessionExit::Shutdown);
    controller.run_once(&mut protocol).unwrap();

    let calls = sim.calls();
    let stop = calls.iter().position(|c| *c == "spindle.stop").unwrap();
    let gcode = calls.iter().position(|c| *c == "gcode.init").unwrap();
    let coolant = calls.iter().position(|c| *c == "coolant.init").unwrap();
    assert!(gcode < stop && stop < coolant);
}

#[test]
fn abort_neutralizes_engine_and_preserves_alarm() {
    let (sim, mut controller) = booted(machine_config(&[0.05, 0.05]), BootPolicy::default());
    let mut observed = Vec::new();

    let mut protocol = session_fn(|session| {
        if observed.is_empty() {
            let feed = PlanLineData::feed(800.0);
            session.queue_linear_move(&xy(10.0, 10.0), &feed).unwrap();
            sim.execute_all();
            session.queue_linear_move(&xy(5.0, 12.0), &feed).unwrap();
            session.controller_state_mut().overrides.set_feed(150);
            session.controller_state_mut().probe_triggered = true;

            let engine = session.engine();
            assert!(!engine.is_neutral());
            assert_eq!(engine.last_direction(0), Direction::Negative);

            // Hard limit trips mid-move.
            session.set_state(SystemState::Alarm);
            session.request_abort();
            observed.push(session.controller_state().clone());
            SessionExit::Abort
        } else {
            let engine = session.engine();
            assert!(engine.is_neutral());
            for axis in 0..6 {
                assert_eq!(engine.last_direction(axis), Direction::Unknown);
                assert_eq!(engine.compensation_remaining(axis), 0.0);
            }
            observed.push(session.controller_state().clone());
            SessionExit::Shutdown
        }
    });

    let report = Supervisor::new().run(&mut controller, &mut protocol).unwrap();
    drop(protocol);

    assert_eq!(report.sessions, 2);
    assert_eq!(report.aborts, 1);

    let (before, after) = (&observed[0], &observed[1]);
    assert!(before.abort);
    assert_eq!(before.overrides.feed, 150);

    assert_eq!(after.state, SystemState::Alarm);
    assert!(!after.abort);
    assert!(!after.probe_triggered);
    assert_eq!(after.overrides.feed, 100);
    assert!(after.realtime.exec_state.is_empty());
    assert_eq!(sim.queued(), 0);
}

#[test]
fn homing_survives_session_restart() {
    let (_sim, mut controller) = booted(homing_config(&[0.0]), homing_lock());
    assert_eq!(controller.state().state, SystemState::Alarm);

    let mut sessions = 0;
    let mut protocol = session_fn(|session| {
        sessions += 1;
        if sessions == 1 {
            session.mark_homed();
            SessionExit::Abort
        } else {
            SessionExit::Shutdown
        }
    });
    Supervisor::new().run(&mut controller, &mut protocol).unwrap();
    drop(protocol);

    assert_eq!(sessions, 2);
    assert!(controller.state().homing_completed);
    assert_eq!(controller.state().state, SystemState::Idle);
}

#[test]
fn planner_resyncs_to_machine_position() {
    let (sim, mut controller) = booted(machine_config(&[0.05]), BootPolicy::default());

    let mut first = true;
    let mut protocol = session_fn(|session| {
        if first {
            first = false;
            let feed = PlanLineData::feed(500.0);
            session.queue_linear_move(&at(0, 10.0), &feed).unwrap();
            session.queue_linear_move(&at(0, 4.0), &feed).unwrap();
            sim.execute_all();
            SessionExit::Abort
        } else {
            SessionExit::Shutdown
        }
    });
    Supervisor::new().run(&mut controller, &mut protocol).unwrap();
    drop(protocol);

    // Physical position carries the injected take-up.
    assert!(approx(sim.machine_position()[0], 3.95));
    assert!(approx(sim.parser_position()[0], 3.95));
    assert_eq!(sim.inspect().planner_position()[0], 3950);
    assert!(approx(controller.engine().commanded_position()[0], 3.95));
    assert_eq!(controller.engine().mpos_offset()[0], 0.0);
}

#[test]
fn session_cap_bounds_restarts() {
    let (_sim, mut controller) = booted(machine_config(&[0.0]), BootPolicy::default());
    let mut protocol = session_fn(|_| SessionExit::Abort);
    let report = Supervisor::new()
        .with_max_sessions(3)
        .run(&mut controller, &mut protocol)
        .unwrap();
    assert_eq!(report.sessions, 3);
    assert_eq!(report.aborts, 3);
}

#[test]
fn shutdown_flag_stops_before_next_session() {
    let (_sim, mut controller) = build(machine_config(&[0.0]), BootPolicy::default());
    let supervisor = Supervisor::new();
    let flag = supervisor.shutdown_flag();

    let mut protocol = session_fn(|_| {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        SessionExit::Abort
    });
    let report = supervisor.run(&mut controller, &mut protocol).unwrap();
    assert!(controller.is_initialized());
    assert_eq!(report.sessions, 1);
}
