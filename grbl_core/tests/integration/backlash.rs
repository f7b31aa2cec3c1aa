//! Backlash compensation through the session glue and the simulated planner.

use grbl_common::motion::{MotionFlags, PlanLineData};
use grbl_common::state::{Direction, SystemState};
use grbl_core::error::MotionError;
use grbl_core::lifecycle::{BootPolicy, SessionExit};

use super::*;

fn feed() -> PlanLineData {
    PlanLineData::feed(600.0)
}

#[test]
fn reversal_queues_take_up_before_target() {
    let (sim, mut controller) = booted(machine_config(&[0.05]), BootPolicy::default());
    let data = PlanLineData {
        spindle_speed: 12000.0,
        line_number: Some(7),
        ..feed()
    };

    let mut protocol = session_fn(|session| {
        session.queue_linear_move(&at(0, 10.0), &data).unwrap();
        sim.execute_all();
        assert_eq!(session.engine().last_direction(0), Direction::Positive);

        session.queue_linear_move(&at(0, 5.0), &data).unwrap();
        assert_eq!(session.engine().compensation_remaining(0), 0.05);
        assert_eq!(session.engine().last_direction(0), Direction::Negative);

        sim.execute_all();
        session.sync_executed();
        assert_eq!(session.engine().compensation_remaining(0), 0.0);
        assert!(approx(session.reported_machine_position()[0], 5.0));
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    let planned = sim.planned();
    assert_eq!(planned.len(), 3);

    let correction = &planned[1];
    assert!(approx(correction.target[0], 9.95));
    assert!(
        correction
            .data
            .motion
            .contains(MotionFlags::RAPID_MOTION | MotionFlags::BACKLASH_MOTION)
    );
    assert_eq!(correction.data.feed_rate, 600.0);
    assert_eq!(correction.data.spindle_speed, 12000.0);
    assert_eq!(correction.data.line_number, Some(7));

    assert!(!planned[2].data.is_backlash_motion());
    assert!(approx(planned[2].target[0], 5.0));
    assert!(approx(sim.machine_position()[0], 4.95));
}

#[test]
fn same_direction_moves_pay_nothing() {
    let (sim, mut controller) = booted(machine_config(&[0.05]), BootPolicy::default());
    let mut protocol = session_fn(|session| {
        for x in [1.0, 2.0, 3.0] {
            session.queue_linear_move(&at(0, x), &feed()).unwrap();
        }
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    assert_eq!(sim.planned().len(), 3);
    assert!(sim.planned().iter().all(|b| !b.data.is_backlash_motion()));
    assert_eq!(controller.engine().corrections(), 0);
}

#[test]
fn zero_backlash_tracks_direction_only() {
    let (sim, mut controller) = booted(machine_config(&[0.0]), BootPolicy::default());
    let mut protocol = session_fn(|session| {
        for x in [10.0, 5.0, 8.0, 2.0] {
            session.queue_linear_move(&at(0, x), &feed()).unwrap();
            sim.execute_all();
        }
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    assert_eq!(sim.planned().len(), 4);
    assert_eq!(controller.engine().corrections(), 0);
    assert_eq!(controller.engine().last_direction(0), Direction::Negative);
    assert!(approx(sim.machine_position()[0], 2.0));
}

#[test]
fn repeated_reversals_each_pay_full_amount() {
    let (sim, mut controller) = booted(machine_config(&[0.05]), BootPolicy::default());
    let mut offsets = Vec::new();
    let mut protocol = session_fn(|session| {
        for x in [10.0, 5.0, 8.0, 2.0] {
            session.queue_linear_move(&at(0, x), &feed()).unwrap();
            sim.execute_all();
            let engine = session.engine();
            let remaining = engine.compensation_remaining(0);
            assert!((0.0..=0.05).contains(&remaining));
            offsets.push(engine.mpos_offset()[0]);
        }
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    assert_eq!(controller.engine().corrections(), 3);
    assert!(offsets.iter().all(|o| o.abs() <= 0.05 + 1e-6));
    assert!(approx(sim.machine_position()[0], 1.95));
    assert!(approx(controller.reported_machine_position()[0], 2.0));
}

#[test]
fn unexecuted_reversal_is_paid_again() {
    let (sim, mut controller) = booted(machine_config(&[0.05]), BootPolicy::default());
    let mut protocol = session_fn(|session| {
        for x in [10.0, 5.0, 8.0] {
            session.queue_linear_move(&at(0, x), &feed()).unwrap();
        }
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    let lash: Vec<_> = sim
        .planned()
        .into_iter()
        .filter(|b| b.data.is_backlash_motion())
        .collect();
    assert_eq!(lash.len(), 2);
    assert!(approx(lash[0].target[0], 9.95));
    assert!(approx(lash[1].target[0], 5.05));
    assert!(approx(controller.engine().compensation_remaining(0), 0.05));
}

#[test]
fn only_reversing_axes_take_up() {
    let (sim, mut controller) = booted(machine_config(&[0.05, 0.02]), BootPolicy::default());
    let mut protocol = session_fn(|session| {
        session.queue_linear_move(&xy(10.0, 10.0), &feed()).unwrap();
        // Y holds still and keeps its direction.
        session.queue_linear_move(&xy(5.0, 10.0), &feed()).unwrap();
        assert_eq!(session.engine().last_direction(1), Direction::Positive);
        session.queue_linear_move(&xy(5.0, 4.0), &feed()).unwrap();
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    let planned = sim.planned();
    assert_eq!(planned.len(), 5);
    assert!(approx(planned[1].target[0], 9.95));
    assert!(approx(planned[1].target[1], 10.0));
    assert!(approx(planned[3].target[0], 5.0));
    assert!(approx(planned[3].target[1], 9.98));
}

#[test]
fn alarm_lock_refuses_motion_until_unlocked() {
    let (sim, mut controller) = booted(homing_config(&[0.05]), homing_lock());
    let mut protocol = session_fn(|session| {
        let err = session
            .queue_linear_move(&at(0, 1.0), &feed())
            .unwrap_err();
        assert_eq!(err, MotionError::Locked(SystemState::Alarm));

        assert!(session.unlock());
        assert!(!session.unlock());
        session.queue_linear_move(&at(0, 1.0), &feed()).unwrap();
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    assert_eq!(sim.planned().len(), 1);
    assert!(!controller.state().homing_completed);
}
