//! System-wide constants for the controller workspace.
//!
//! Single source of truth for axis bounds and override limits.

use static_assertions::const_assert;

/// Maximum number of machine axes (compile-time bound).
pub const MAX_N_AXIS: usize = 6;

const_assert!(MAX_N_AXIS >= 1 && MAX_N_AXIS <= 6);

/// Axis letters, indexed by axis ordinal.
pub const AXIS_LETTERS: [char; MAX_N_AXIS] = ['X', 'Y', 'Z', 'A', 'B', 'C'];

/// Number of blocks the planner ring buffer can hold.
pub const BLOCK_BUFFER_SIZE: usize = 16;

/// Default feed override [%].
pub const FEED_OVERRIDE_DEFAULT: u8 = 100;
/// Minimum feed override [%].
pub const FEED_OVERRIDE_MIN: u8 = 10;
/// Maximum feed override [%].
pub const FEED_OVERRIDE_MAX: u8 = 200;

/// Default rapid override [%].
pub const RAPID_OVERRIDE_DEFAULT: u8 = 100;
/// Allowed rapid override levels [%].
pub const RAPID_OVERRIDE_LEVELS: [u8; 3] = [25, 50, 100];

/// Default spindle speed override [%].
pub const SPINDLE_OVERRIDE_DEFAULT: u8 = 100;
/// Minimum spindle speed override [%].
pub const SPINDLE_OVERRIDE_MIN: u8 = 10;
/// Maximum spindle speed override [%].
pub const SPINDLE_OVERRIDE_MAX: u8 = 200;

/// Default steps per millimeter when no settings are stored.
pub const DEFAULT_STEPS_PER_MM: f32 = 250.0;

/// Default settings file path.
pub const DEFAULT_SETTINGS_PATH: &str = "config/machine.toml";

/// Firmware banner emitted with the init message.
pub const GRBL_VERSION: &str = "1.3a";
