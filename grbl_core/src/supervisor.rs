//! Outer restart loop.
//!
//! Runs cold init once, then re-enters `Controller::run_once()` after every
//! abort. A shutdown request or a `SessionExit::Shutdown` ends the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::error::InitError;
use crate::lifecycle::{Controller, Protocol, SessionExit};

/// Result of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Sessions entered.
    pub sessions: u64,
    /// Sessions that ended in an abort.
    pub aborts: u64,
}

/// Restart loop around the lifecycle controller.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    max_sessions: Option<u64>,
    shutdown: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `limit` sessions.
    pub fn with_max_sessions(mut self, limit: u64) -> Self {
        self.max_sessions = Some(limit);
        self
    }

    /// Use an external shutdown flag (e.g. set from a signal handler).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Shutdown flag observed between sessions.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Cold init if needed, then run sessions until shutdown.
    ///
    /// # Errors
    /// Propagates cold init failures. No session runs after one.
    pub fn run(
        &self,
        controller: &mut Controller,
        protocol: &mut dyn Protocol,
    ) -> Result<SupervisorReport, InitError> {
        if !controller.is_initialized() {
            controller.cold_init()?;
        }

        let mut report = SupervisorReport {
            sessions: 0,
            aborts: 0,
        };
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                break;
            }
            if self.max_sessions.is_some_and(|max| report.sessions >= max) {
                warn!("Session limit {} reached", report.sessions);
                break;
            }

            report.sessions += 1;
            match controller.run_once(protocol)? {
                SessionExit::Abort => {
                    report.aborts += 1;
                    info!("Restarting session {}", report.sessions + 1);
                }
                SessionExit::Shutdown => break,
            }
        }
        Ok(report)
    }
}
