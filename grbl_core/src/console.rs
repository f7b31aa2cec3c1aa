//! Line-oriented console protocol for the simulated machine.
//!
//! | Input | Action |
//! |-------|--------|
//! | `[G0\|G1] X.. Y.. Z.. A.. B.. C.. [F..]` | Linear move (modal rapid/feed) |
//! | `?` | Status report |
//! | `$H` | Homing cycle |
//! | `$X` | Alarm unlock |
//! | `PRB X..` | Probe contact at the given position |
//! | `reset` / `^X` | Abort the session |
//! | EOF | Shut down |

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use grbl_common::consts::{AXIS_LETTERS, MAX_N_AXIS};
use grbl_common::motion::PlanLineData;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::MotionError;
use crate::lifecycle::{Protocol, Session, SessionExit};
use crate::sim::SimMachine;

/// Soft-reset character (Ctrl-X).
pub const CMD_RESET: char = '\x18';

const DEFAULT_FEED_RATE: f32 = 500.0;

/// Axis words given on a command line. `None` keeps the current position.
pub type AxisWords = [Option<f32>; MAX_N_AXIS];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Status,
    Home,
    Unlock,
    Reset,
    Probe(AxisWords),
    Move {
        rapid: Option<bool>,
        words: AxisWords,
        feed: Option<f32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported command '{0}'")]
    Unsupported(String),
    #[error("bad number in word '{0}'")]
    BadNumber(String),
    #[error("no axis words")]
    NoAxisWords,
}

impl ParseError {
    /// Numeric code reported to the operator.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Unsupported(_) => 20,
            Self::BadNumber(_) => 2,
            Self::NoAxisWords => 26,
        }
    }
}

/// Parse one console line. Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.contains(CMD_RESET) || line.eq_ignore_ascii_case("reset") {
        return Ok(Some(Command::Reset));
    }
    let upper = line.to_ascii_uppercase();
    match upper.as_str() {
        "?" => return Ok(Some(Command::Status)),
        "$H" => return Ok(Some(Command::Home)),
        "$X" => return Ok(Some(Command::Unlock)),
        _ => {}
    }

    let mut tokens = upper.split_whitespace().peekable();
    let probe = tokens.next_if_eq(&"PRB").is_some();
    let mut rapid = None;
    let mut words: AxisWords = [None; MAX_N_AXIS];
    let mut feed = None;

    for token in tokens {
        let mut chars = token.chars();
        let letter = chars.next().unwrap_or(' ');
        let value = chars.as_str();
        match letter {
            'G' if !probe && (value == "0" || value == "00") => rapid = Some(true),
            'G' if !probe && (value == "1" || value == "01") => rapid = Some(false),
            'F' if !probe => feed = Some(parse_value(token, value)?),
            _ => {
                let axis = AXIS_LETTERS
                    .iter()
                    .position(|c| *c == letter)
                    .ok_or_else(|| ParseError::Unsupported(token.to_string()))?;
                words[axis] = Some(parse_value(token, value)?);
            }
        }
    }

    let has_axis = words.iter().any(Option::is_some);
    if probe {
        return if has_axis {
            Ok(Some(Command::Probe(words)))
        } else {
            Err(ParseError::NoAxisWords)
        };
    }
    if !has_axis && rapid.is_none() && feed.is_none() {
        return Err(ParseError::NoAxisWords);
    }
    Ok(Some(Command::Move { rapid, words, feed }))
}

fn parse_value(token: &str, value: &str) -> Result<f32, ParseError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::BadNumber(token.to_string()))
}

/// Console protocol driving the simulated machine.
pub struct ConsoleProtocol<R: BufRead, W: Write> {
    input: R,
    out: W,
    sim: SimMachine,
    shutdown: Arc<AtomicBool>,
    rapid: bool,
    feed_rate: f32,
}

impl<R: BufRead, W: Write> ConsoleProtocol<R, W> {
    pub fn new(input: R, out: W, sim: SimMachine, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            input,
            out,
            sim,
            shutdown,
            rapid: false,
            feed_rate: DEFAULT_FEED_RATE,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn reply(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("console write failed: {e}");
        }
    }

    fn execute(&mut self, session: &mut Session<'_>, command: Command) -> Option<SessionExit> {
        match command {
            Command::Status => {
                let state = session.state();
                let mpos = session.reported_machine_position();
                session.reporter().status(state, &mpos);
            }
            Command::Home => {
                session.mark_homed();
            }
            Command::Unlock => {
                if session.unlock() {
                    session.reporter().feedback("Caution: Unlocked");
                }
            }
            Command::Reset => {
                session.request_abort();
                return Some(SessionExit::Abort);
            }
            Command::Probe(words) => {
                let mut contact = self.sim.machine_position();
                apply_words(&mut contact, &words);
                self.sim.probe_contact(&contact);
                session.probe_stop_resolved();
            }
            Command::Move { rapid, words, feed } => {
                if let Some(rapid) = rapid {
                    self.rapid = rapid;
                }
                if let Some(feed) = feed {
                    self.feed_rate = feed;
                }
                let mut target = session.commanded_position();
                apply_words(&mut target, &words);
                let data = if self.rapid {
                    PlanLineData::rapid()
                } else {
                    PlanLineData::feed(self.feed_rate)
                };
                match session.queue_linear_move(&target, &data) {
                    Ok(()) => {
                        let executed = self.sim.execute_all();
                        debug!("executed {executed} blocks");
                    }
                    Err(MotionError::Locked(state)) => {
                        debug!("move refused in {state:?}");
                        self.reply("error:9");
                        return None;
                    }
                }
            }
        }
        self.reply("ok");
        None
    }
}

fn apply_words(position: &mut [f32; MAX_N_AXIS], words: &AxisWords) {
    for (p, word) in position.iter_mut().zip(words.iter()) {
        if let Some(value) = word {
            *p = *value;
        }
    }
}

impl<R: BufRead, W: Write> Protocol for ConsoleProtocol<R, W> {
    fn run(&mut self, session: &mut Session<'_>) -> SessionExit {
        let mut line = String::new();
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return SessionExit::Shutdown;
            }
            line.clear();
            match self.input.read_line(&mut line) {
                Ok(0) => return SessionExit::Shutdown,
                Ok(_) => {}
                Err(e) => {
                    warn!("console read failed: {e}");
                    return SessionExit::Shutdown;
                }
            }
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if let Some(exit) = self.execute(session, command) {
                        return exit;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("parse error: {e}");
                    self.reply(&format!("error:{}", e.code()));
                }
            }
        }
    }
}
