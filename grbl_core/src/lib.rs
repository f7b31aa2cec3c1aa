//! # GRBL Core Library
//!
//! Startup/reset lifecycle and backlash compensation for a multi-axis motion
//! controller. The lifecycle controller brings the machine from power-on to
//! its boot state, re-normalizes transient state at the start of every
//! session, and hands each linear move through the backlash engine before it
//! reaches the planner.
//!
//! ## Control Flow
//!
//! ```text
//! Supervisor ──▶ Controller::cold_init()            (once)
//!            └─▶ loop { Controller::run_once()       (warm reset + protocol)
//!                         └─▶ Session::queue_linear_move()
//!                               └─▶ BacklashEngine::compensate() ─▶ Planner }
//! ```
//!
//! ## Concurrency
//!
//! Engine and controller state are foreground-only. The stepper side is the
//! single writer of the machine position, read through consistent snapshots.

pub mod backlash;
pub mod collaborators;
pub mod console;
pub mod error;
pub mod lifecycle;
pub mod report;
pub mod settings;
pub mod sim;
pub mod spindle;
pub mod supervisor;
pub mod system;
