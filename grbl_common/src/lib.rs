//! GRBL Common Library
//!
//! Shared constants, settings and runtime types used by every crate in the
//! controller workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Axis bounds, override limits and buffer sizes
//! - [`config`] - Settings loading traits and the machine configuration
//! - [`state`] - System state and axis direction enums
//! - [`exec`] - Real-time execution flags, alarms and overrides
//! - [`motion`] - Axis vectors and plan-line metadata
//! - [`position`] - Stepper → foreground machine position handoff
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod exec;
pub mod motion;
pub mod position;
pub mod prelude;
pub mod state;
