//! # Logging Setup
//!
//! The driver logs through the `log` facade. Binaries install `env_logger`
//! with [`init_logger`] and pick verbosity with `RUST_LOG`
//! (e.g. `RUST_LOG=ebyte_rs=debug` to see every frame).

use log::{debug, error, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Like [`init_logger`], but does nothing if a logger is already installed.
///
/// Useful in tests, where every test may try to install one.
pub fn try_init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
