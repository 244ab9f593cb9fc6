use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::fs;
use std::path::Path;

use crate::error::Result;

// Define where to store logs
const LOG_DIR: &str = "logs";

/// The per-channel log files. Core code selects a channel through the log
/// *target*, e.g. `log::info!(target: "scheduling", "...")`; everything with
/// an unknown target lands in `events.log`.
const CHANNELS: [(&str, &str); 5] = [
    ("scheduling", "scheduling.log"),
    ("events", "events.log"),
    ("resources", "resources.log"),
    ("performance", "performance.log"),
    ("memory", "memory.log"),
];

/// Initializes the global logger.
///
/// This function should be called once at the very beginning of the
/// application's `main` function, before any simulation component starts.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Example: `RUST_LOG=info cargo run`
///
/// If `RUST_LOG` is not set, it defaults to `info`. Each channel gets its own
/// file under `logs/`; the console carries all channels. Failure to create
/// the log directory is fatal (the simulation must not start half-observed).
pub fn init() -> Result<()> {
    fs::create_dir_all(LOG_DIR)?;

    // Get the log level from RUST_LOG, defaulting to "info"
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let mut base_config = Dispatch::new().level(log_level_filter);

    let console_config = Dispatch::new()
        .format(|out, message, record| {
            let colors = fern::colors::ColoredLevelConfig::new()
                .error(fern::colors::Color::Red)
                .warn(fern::colors::Color::Yellow)
                .info(fern::colors::Color::Green)
                .debug(fern::colors::Color::Blue)
                .trace(fern::colors::Color::BrightBlack);

            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());
    base_config = base_config.chain(console_config);

    for (target, file_name) in CHANNELS {
        base_config = base_config.chain(channel_config(target, file_name)?);
    }

    base_config.apply().unwrap_or_else(|e| {
        // A second init (tests run in one process) is not an error worth dying for.
        eprintln!("Failed to apply logger configuration: {}", e);
    });

    log::info!(target: "events", "Logger initialized. Channel files live under '{}/'.", LOG_DIR);
    Ok(())
}

/// Builds the dispatch chain for one channel: plain timestamped lines,
/// filtered so only records logged with the channel's target land in it.
fn channel_config(target: &'static str, file_name: &str) -> Result<Dispatch> {
    let path = Path::new(LOG_DIR).join(file_name);

    let dispatch = Dispatch::new()
        .filter(move |meta| meta.target() == target)
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), record.level(), message))
        })
        .chain(fern::log_file(&path)?);

    Ok(dispatch)
}
