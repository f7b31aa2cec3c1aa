//! Operator-facing message formatting and a line-oriented reporter.

use std::io::Write;

use grbl_common::consts::{GRBL_VERSION, MAX_N_AXIS};
use grbl_common::motion::AxisVector;
use grbl_common::state::SystemState;
use tracing::warn;

use crate::collaborators::Reporter;

/// Feedback emitted after a warm reset that left the machine in `Alarm`.
pub const ALARM_LOCK_NOTICE: &str = "[MSG:'$H'|'$X' to unlock]";

/// Startup banner.
pub fn welcome_line() -> String {
    format!("Grbl {GRBL_VERSION} ['$' for help]")
}

/// Lines emitted by `Reporter::init_message` for `state`.
pub fn init_lines(state: SystemState) -> Vec<String> {
    let mut lines = vec![welcome_line()];
    if state == SystemState::Alarm {
        lines.push(ALARM_LOCK_NOTICE.to_string());
    }
    lines
}

/// Real-time status report, e.g. `<Idle|MPos:1.000,0.000,0.000>`.
pub fn status_line(state: SystemState, machine_position: &AxisVector, axis_count: usize) -> String {
    let axes = axis_count.clamp(1, MAX_N_AXIS);
    let mpos = machine_position[..axes]
        .iter()
        .map(|p| format!("{p:.3}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("<{}|MPos:{mpos}>", state.as_str())
}

/// Feedback message wrapper, e.g. `[MSG:Reset to continue]`.
pub fn feedback_line(message: &str) -> String {
    format!("[MSG:{message}]")
}

/// Reporter writing one message per line to any `Write` sink.
pub struct LineReporter<W: Write> {
    out: W,
    axis_count: usize,
}

impl<W: Write> LineReporter<W> {
    pub fn new(out: W, axis_count: usize) -> Self {
        Self { out, axis_count }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("report write failed: {e}");
        }
    }
}

impl<W: Write> Reporter for LineReporter<W> {
    fn init_message(&mut self, state: SystemState) {
        for line in init_lines(state) {
            self.emit(&line);
        }
    }

    fn status(&mut self, state: SystemState, machine_position: &AxisVector) {
        let line = status_line(state, machine_position, self.axis_count);
        self.emit(&line);
    }

    fn feedback(&mut self, message: &str) {
        let line = feedback_line(message);
        self.emit(&line);
    }
}
