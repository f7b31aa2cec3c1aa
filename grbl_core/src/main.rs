//! # GRBL Controller
//!
//! Runs the lifecycle controller against the simulated machine with a
//! line-oriented console on stdin/stdout. Settings come from a TOML file;
//! a missing file boots with factory defaults.

use clap::Parser;
use grbl_common::consts::{DEFAULT_SETTINGS_PATH, MAX_N_AXIS};
use grbl_core::console::ConsoleProtocol;
use grbl_core::lifecycle::{BootPolicy, Controller};
use grbl_core::report::LineReporter;
use grbl_core::settings::FileSettings;
use grbl_core::sim::SimMachine;
use grbl_core::supervisor::Supervisor;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// GRBL controller: backlash-compensated motion on a simulated machine
#[derive(Parser, Debug)]
#[command(name = "grbl")]
#[command(version)]
#[command(about = "Motion controller lifecycle with backlash compensation")]
struct Args {
    /// Path to the machine settings TOML.
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level). Overrides `[shared] log_level`.
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("GRBL controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("GRBL controller shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = FileSettings::new(&args.config);
    let sim = SimMachine::new();
    let mut subsystems = sim.subsystems(Box::new(settings));
    subsystems.reporter = Box::new(LineReporter::new(io::stdout(), MAX_N_AXIS));

    let policy = BootPolicy::from_build();
    info!("Boot policy: {policy:?}");
    let mut controller = Controller::new(subsystems, sim.position(), policy);

    let shutdown = Arc::new(AtomicBool::new(false));
    let r = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(true, Ordering::SeqCst);
    })?;

    let supervisor = Supervisor::new().with_shutdown_flag(shutdown.clone());
    let mut protocol = ConsoleProtocol::new(io::stdin().lock(), io::stdout(), sim, shutdown);
    let report = supervisor.run(&mut controller, &mut protocol)?;
    info!("{} sessions, {} aborts", report.sessions, report.aborts);
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(FileSettings::log_level(&args.config))
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr; stdout carries the console protocol.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}
