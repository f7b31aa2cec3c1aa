//! Probe-triggered stop and resynchronization.

use grbl_common::motion::PlanLineData;
use grbl_common::state::Direction;
use grbl_core::lifecycle::{BootPolicy, SessionExit};

use super::*;

#[test]
fn probe_stop_discards_direction_memory() {
    let (sim, mut controller) = booted(machine_config(&[0.05, 0.05, 0.05]), BootPolicy::default());
    let feed = PlanLineData::feed(300.0);

    let mut protocol = session_fn(|session| {
        session.queue_linear_move(&xy(10.0, 10.0), &feed).unwrap();
        session.queue_linear_move(&xy(5.0, 10.0), &feed).unwrap();
        sim.execute_all();

        // Probe toward the workpiece; contact before the target.
        let mut plunge = xy(5.0, 10.0);
        plunge[2] = -5.0;
        session.queue_linear_move(&plunge, &feed).unwrap();
        let mut contact = sim.machine_position();
        contact[2] = -3.2;
        sim.probe_contact(&contact);
        assert!(sim.probe_triggered());

        session.probe_stop_resolved();

        let engine = session.engine();
        for axis in 0..6 {
            assert_eq!(engine.last_direction(axis), Direction::Unknown);
            assert_eq!(engine.compensation_remaining(axis), 0.0);
            assert_eq!(engine.mpos_offset()[axis], 0.0);
        }
        assert!(approx(session.commanded_position()[2], -3.2));
        assert!(session.controller_state().probe_succeeded);
        assert_eq!(session.controller_state().probe_position[2], -3200);
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    assert_eq!(sim.queued(), 0);
    assert!(!sim.probe_triggered());
    assert!(approx(sim.parser_position()[2], -3.2));
    assert_eq!(sim.inspect().planner_position()[2], -3200);
}

#[test]
fn first_move_after_probe_pays_no_take_up() {
    let (sim, mut controller) = booted(machine_config(&[0.05, 0.05, 0.05]), BootPolicy::default());
    let feed = PlanLineData::feed(300.0);
    let mut planned_before = 0;

    let mut protocol = session_fn(|session| {
        session.queue_linear_move(&at(0, 10.0), &feed).unwrap();
        session.queue_linear_move(&at(0, 5.0), &feed).unwrap();
        sim.execute_all();
        let mut plunge = session.commanded_position();
        plunge[2] = -5.0;
        session.queue_linear_move(&plunge, &feed).unwrap();

        let mut contact = sim.machine_position();
        contact[2] = -1.0;
        sim.probe_contact(&contact);
        session.probe_stop_resolved();
        planned_before = sim.planned().len();

        // X would have reversed, Z retracts against the plunge.
        let mut retract = session.commanded_position();
        retract[0] += 2.0;
        retract[2] = 2.0;
        session.queue_linear_move(&retract, &feed).unwrap();
        SessionExit::Shutdown
    });
    controller.run_once(&mut protocol).unwrap();
    drop(protocol);

    let planned = sim.planned();
    assert_eq!(planned.len(), planned_before + 1);
    assert!(!planned[planned_before].data.is_backlash_motion());
    assert_eq!(controller.engine().last_direction(0), Direction::Positive);
    assert_eq!(controller.engine().last_direction(2), Direction::Positive);
}
