use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use airport_ops_sim::config::SimulationConfig;
use airport_ops_sim::engine::SimulationEngine;
use airport_ops_sim::logger;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_signal: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

#[derive(Debug, Parser)]
#[command(name = "airport_ops_sim", about = "Airport operational control-plane simulator")]
struct Args {
    /// Path to a JSON config file; defaults apply for missing fields.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the simulated run length in time units.
    #[arg(long)]
    duration: Option<i64>,

    /// No dashboard and no start prompt.
    #[arg(long)]
    headless: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init().context("logger initialisation failed")?;

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path).with_context(|| format!("failed to load config '{}'", path))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(duration) = args.duration {
        config.simulation_duration = duration;
    }
    if args.headless {
        config.dashboard_enabled = false;
    }

    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
    }

    println!("==============================================");
    println!("   Airport Operations Control-Plane Simulator");
    println!("==============================================");

    let mut engine = SimulationEngine::new(config.clone());
    engine.initialize().context("simulation initialisation failed")?;

    if !args.headless {
        println!("Press Enter to start (Ctrl+C to exit)...");
        let mut byte = [0u8; 1];
        let _ = std::io::stdin().read(&mut byte);
    }

    if !SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
        engine.start();
        let core = engine.core();
        while core.is_running()
            && !SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
            && core.clock.now() < config.simulation_duration
        {
            std::thread::sleep(Duration::from_millis(100));
        }
        engine.stop();
    }

    println!("Simulation complete. Logs live under logs/.");
    Ok(())
}
