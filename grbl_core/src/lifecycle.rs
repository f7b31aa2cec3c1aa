//! Lifecycle controller: cold init, warm reset and one supervised session.
//!
//! ## Cold Init (once per power cycle)
//! 1. Client transport
//! 2. Display hook
//! 3. Settings load
//! 4. Stepper pins and timers
//! 5. System pins
//! 6. Backlash engine
//! 7. Motor drivers
//! 8. Machine position cleared
//! 9. Machine hook
//! 10. Boot state decided (`Idle` or `Alarm`)
//! 11. Spindle driver selected
//! 12. Input buffering started
//!
//! ## Warm Reset (start of every session)
//! Transient state is cleared, collaborators are re-initialized, and the
//! planner, backlash engine and parser are re-synchronized to the machine
//! position. `SystemState` is preserved.

use std::sync::Arc;

use grbl_common::consts::MAX_N_AXIS;
use grbl_common::exec::ExecState;
use grbl_common::motion::{AxisVector, PlanLineData, StepVector};
use grbl_common::position::{SharedPosition, steps_to_mpos};
use grbl_common::state::SystemState;
use tracing::{debug, error, info, warn};

use crate::backlash::BacklashEngine;
use crate::collaborators::{
    Client, Coolant, GcodeParser, Limits, MachineHooks, MotorDrivers, Planner, Probe, Reporter,
    Settings, Spindle, Stepper, SystemPins,
};
use crate::error::{InitError, MotionError, Subsystem, SubsystemError};
use crate::spindle::SpindleRegistry;
use crate::system::ControllerState;

// ─── Boot Policy ────────────────────────────────────────────────────

/// Build-time policy deciding the boot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootPolicy {
    /// Always boot into `Alarm`.
    pub force_init_alarm: bool,
    /// Boot into `Alarm` while homing is enabled but not yet performed.
    pub homing_init_lock: bool,
}

impl BootPolicy {
    /// Policy selected by cargo features.
    pub const fn from_build() -> Self {
        Self {
            force_init_alarm: cfg!(feature = "force-init-alarm"),
            homing_init_lock: cfg!(feature = "homing-init-lock"),
        }
    }

    /// Boot state for the given homing situation.
    ///
    /// `Alarm` here is a safety lock: it blocks every motion command,
    /// startup blocks included, until homing or an explicit unlock.
    pub const fn boot_state(&self, homing_enabled: bool, homing_completed: bool) -> SystemState {
        if self.force_init_alarm
            || (self.homing_init_lock && homing_enabled && !homing_completed)
        {
            SystemState::Alarm
        } else {
            SystemState::Idle
        }
    }
}

// ─── Subsystems ─────────────────────────────────────────────────────

/// Collaborators driven by the controller.
pub struct Subsystems {
    pub client: Box<dyn Client>,
    pub settings: Box<dyn Settings>,
    pub stepper: Box<dyn Stepper>,
    pub system_pins: Box<dyn SystemPins>,
    pub motors: Box<dyn MotorDrivers>,
    pub planner: Box<dyn Planner>,
    pub gcode: Box<dyn GcodeParser>,
    pub probe: Box<dyn Probe>,
    pub coolant: Box<dyn Coolant>,
    pub limits: Box<dyn Limits>,
    pub reporter: Box<dyn Reporter>,
    pub hooks: Box<dyn MachineHooks>,
    pub spindles: SpindleRegistry,
}

fn start(subsystem: Subsystem, result: Result<(), SubsystemError>) -> Result<(), InitError> {
    match result {
        Ok(()) => {
            debug!("{subsystem} initialized");
            Ok(())
        }
        Err(source) => {
            error!("{subsystem} initialization failed: {source}");
            Err(InitError::Subsystem { subsystem, source })
        }
    }
}

// ─── Session ────────────────────────────────────────────────────────

/// Why a session returned control to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// System abort. The supervisor restarts the session.
    Abort,
    /// Host requested shutdown.
    Shutdown,
}

/// Blocking command-processing loop run inside a session.
pub trait Protocol {
    /// Process commands until an abort or shutdown.
    fn run(&mut self, session: &mut Session<'_>) -> SessionExit;
}

impl<F> Protocol for F
where
    F: FnMut(&mut Session<'_>) -> SessionExit,
{
    fn run(&mut self, session: &mut Session<'_>) -> SessionExit {
        self(session)
    }
}

/// Foreground access to the controller for the duration of a session.
pub struct Session<'a> {
    controller: &'a mut Controller,
}

impl Session<'_> {
    /// Current system state.
    #[inline]
    pub fn state(&self) -> SystemState {
        self.controller.state.state
    }

    /// Set the system state.
    pub fn set_state(&mut self, state: SystemState) {
        self.controller.state.state = state;
    }

    /// Full runtime state.
    pub fn controller_state(&self) -> &ControllerState {
        &self.controller.state
    }

    /// Mutable runtime state.
    pub fn controller_state_mut(&mut self) -> &mut ControllerState {
        &mut self.controller.state
    }

    /// Backlash engine, read-only.
    pub fn engine(&self) -> &BacklashEngine {
        &self.controller.engine
    }

    /// Operator message sink.
    pub fn reporter(&mut self) -> &mut dyn Reporter {
        self.controller.subsystems.reporter.as_mut()
    }

    /// Last commanded logical position.
    pub fn commanded_position(&self) -> AxisVector {
        self.controller.engine.commanded_position()
    }

    /// Fold executed take-up travel reported by the stepper into the engine.
    pub fn sync_executed(&mut self) {
        let travel = self.controller.subsystems.stepper.executed_backlash_travel();
        self.controller.engine.consume_correction(&travel);
    }

    /// Compensate a linear move for backlash and hand it to the planner.
    ///
    /// The take-up segment, if any, is queued first.
    ///
    /// # Errors
    /// Returns `MotionError::Locked` when the current state blocks motion.
    pub fn queue_linear_move(
        &mut self,
        target: &AxisVector,
        data: &PlanLineData,
    ) -> Result<(), MotionError> {
        let state = self.state();
        if state.blocks_motion() {
            return Err(MotionError::Locked(state));
        }
        self.sync_executed();

        let controller = &mut *self.controller;
        let compensated = controller.engine.compensate(target, data);
        let planner = controller.subsystems.planner.as_mut();
        if let Some(correction) = compensated.correction {
            planner.enqueue(&correction.target, &correction.data);
        }
        planner.enqueue(&compensated.target, data);
        Ok(())
    }

    /// Resynchronize after a probe-triggered stop.
    ///
    /// The stepper has already published the stop position; the remainder
    /// of the probing motion is discarded.
    pub fn probe_stop_resolved(&mut self) {
        let controller = &mut *self.controller;
        controller.subsystems.stepper.reset();
        controller.subsystems.planner.reset();

        let steps = controller.position.snapshot();
        let mpos = controller.to_mpos(&steps);
        controller.subsystems.planner.sync_position(&mpos);
        controller.engine.synch_position_while_using_probe(&mpos);
        controller.subsystems.gcode.sync_position(&mpos);

        controller.state.probe_position = steps;
        controller.state.probe_succeeded = true;
        controller.state.probe_triggered = false;
        controller.subsystems.probe.set_triggered(false);
        debug!("probe stop resolved at {mpos:?}");
    }

    /// Record a completed homing cycle and release the alarm lock.
    pub fn mark_homed(&mut self) {
        self.controller.state.homing_completed = true;
        if self.state() == SystemState::Alarm {
            self.set_state(SystemState::Idle);
        }
        info!("Homing complete");
    }

    /// Release the alarm lock without homing.
    pub fn unlock(&mut self) -> bool {
        if self.state() == SystemState::Alarm {
            self.set_state(SystemState::Idle);
            warn!("Alarm lock cleared without homing");
            true
        } else {
            false
        }
    }

    /// Flag a system abort. The protocol should return `SessionExit::Abort`.
    pub fn request_abort(&mut self) {
        self.controller.state.abort = true;
        self.controller.state.realtime.exec_state |= ExecState::RESET;
    }

    /// Machine position with injected lash removed [mm].
    pub fn reported_machine_position(&self) -> AxisVector {
        self.controller.reported_machine_position()
    }
}

// ─── Controller ─────────────────────────────────────────────────────

/// Owns the runtime state, the backlash engine and every collaborator.
pub struct Controller {
    subsystems: Subsystems,
    spindle: Option<Box<dyn Spindle>>,
    position: Arc<SharedPosition>,
    engine: BacklashEngine,
    state: ControllerState,
    policy: BootPolicy,
    steps_per_mm: AxisVector,
    initialized: bool,
}

impl Controller {
    /// Create an uninitialized controller.
    ///
    /// `position` is written by the stepper side and only snapshotted here.
    pub fn new(subsystems: Subsystems, position: Arc<SharedPosition>, policy: BootPolicy) -> Self {
        Self {
            subsystems,
            spindle: None,
            position,
            engine: BacklashEngine::new(),
            state: ControllerState::default(),
            policy,
            steps_per_mm: [0.0; MAX_N_AXIS],
            initialized: false,
        }
    }

    /// Bring the controller from power-on to its boot state.
    ///
    /// # Errors
    /// Any subsystem failure is fatal. Calling twice returns
    /// `InitError::AlreadyInitialized`.
    pub fn cold_init(&mut self) -> Result<(), InitError> {
        if self.initialized {
            return Err(InitError::AlreadyInitialized);
        }
        info!("Cold init");

        let s = &mut self.subsystems;
        start(Subsystem::Client, s.client.init())?;
        start(Subsystem::Display, s.hooks.display_init())?;
        start(Subsystem::Settings, s.settings.init())?;
        self.steps_per_mm = s.settings.steps_per_mm();
        start(Subsystem::Stepper, s.stepper.init())?;
        start(Subsystem::SystemPins, s.system_pins.init())?;

        self.engine.initialize(s.settings.as_ref());

        start(Subsystem::MotorDrivers, s.motors.init())?;
        // Stepper timer is configured but idle; no concurrent writer yet.
        self.position.clear();
        start(Subsystem::Machine, s.hooks.machine_init())?;

        self.state = ControllerState::default();
        self.state.state = self
            .policy
            .boot_state(s.settings.homing_enabled(), self.state.homing_completed);
        if self.state.state == SystemState::Alarm {
            info!("Boot state: Alarm (homing or unlock required)");
        } else {
            info!("Boot state: {:?}", self.state.state);
        }

        let kind = s.settings.spindle_kind();
        let mut spindle = s
            .spindles
            .select(kind)
            .inspect_err(|e| error!("{e}"))?;
        start(Subsystem::Spindle, spindle.init())?;
        info!("Spindle: {}", spindle.name());
        self.spindle = Some(spindle);

        s.client.begin_input();
        self.initialized = true;
        info!("Cold init complete");
        Ok(())
    }

    /// Re-normalize transient state at the start of a session.
    pub fn warm_reset(&mut self) {
        self.state.reset_for_session();

        let s = &mut self.subsystems;
        s.probe.set_triggered(false);
        s.client.reset_read_buffer();
        s.gcode.init();
        if let Some(spindle) = self.spindle.as_mut() {
            spindle.stop();
        }
        s.coolant.init();
        s.limits.init();
        s.probe.init();
        s.planner.reset();
        s.stepper.reset();

        let mpos = self.machine_position();
        let s = &mut self.subsystems;
        s.planner.sync_position(&mpos);
        self.engine.reset_targets(&mpos);
        s.gcode.sync_position(&mpos);
        s.reporter.init_message(self.state.state);
        debug!("Warm reset complete, state={:?}", self.state.state);
    }

    /// Run one supervised session: warm reset, then the protocol loop.
    ///
    /// # Errors
    /// Returns `InitError::NotInitialized` before `cold_init()`.
    pub fn run_once(&mut self, protocol: &mut dyn Protocol) -> Result<SessionExit, InitError> {
        if !self.initialized {
            return Err(InitError::NotInitialized);
        }
        self.warm_reset();
        let exit = protocol.run(&mut Session { controller: self });
        match exit {
            SessionExit::Abort => info!("Session aborted in {:?}", self.state.state),
            SessionExit::Shutdown => info!("Session ended for shutdown"),
        }
        Ok(exit)
    }

    /// Whether cold init has completed.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Runtime state.
    #[inline]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Backlash engine, read-only.
    #[inline]
    pub fn engine(&self) -> &BacklashEngine {
        &self.engine
    }

    /// Boot policy in effect.
    #[inline]
    pub fn policy(&self) -> BootPolicy {
        self.policy
    }

    /// Name of the selected spindle driver.
    pub fn spindle_name(&self) -> Option<&'static str> {
        self.spindle.as_ref().map(|s| s.name())
    }

    /// Consistent machine position snapshot [mm].
    pub fn machine_position(&self) -> AxisVector {
        self.to_mpos(&self.position.snapshot())
    }

    /// Machine position with injected lash removed [mm].
    pub fn reported_machine_position(&self) -> AxisVector {
        let mut mpos = self.machine_position();
        for (p, offset) in mpos.iter_mut().zip(self.engine.mpos_offset().iter()) {
            *p -= offset;
        }
        mpos
    }

    fn to_mpos(&self, steps: &StepVector) -> AxisVector {
        steps_to_mpos(steps, &self.steps_per_mm)
    }
}
