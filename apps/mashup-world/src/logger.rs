//! Logging for the world mashup.
//!
//! Coloured stdout plus a plain `world.log` file, initialized once per
//! process.

use crate::error::WorldError;

use common::ErrorLocation;

use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "world.log";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Initialize stdout + file logging under `log_dir`.
///
/// The log file is opened on every call, so an unusable directory is always
/// reported. Only the first successful call installs the logger; later calls
/// log a warning and return `Ok`.
///
/// # Errors
///
/// [`WorldError::World`] if the log file cannot be opened or the logger
/// cannot be installed.
pub fn initialize(log_dir: &Path) -> Result<(), WorldError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = fern::log_file(&log_file_path).map_err(|e| WorldError::World {
        message: format!("Failed to open log file {}: {e}", log_file_path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = install(log_file);
        if result.is_ok() {
            info!("Logger initialized with level: {LOG_LEVEL:?}");
            info!("Logging to {}", log_file_path.display());
        }
    });

    result
}

#[track_caller]
fn install(log_file: std::fs::File) -> Result<(), WorldError> {
    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = colors.color(record.level()),
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(log_file);

    Dispatch::new()
        .level(LOG_LEVEL)
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| WorldError::World {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
