//! Unit tests for the logging functionality in the `ebyte-rs` crate.

use ebyte_rs::logging::{log_debug, log_error, log_info, log_warn, try_init_logger};
use ebyte_rs::util::logging::{log_frame_hex, LogThrottle};

/// Tests that the logging helpers do not panic once a logger is installed.
#[test]
fn test_logging() {
    try_init_logger();
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
    log_frame_hex("TX", &[0xC1, 0x00, 0x06]);
}

/// Tests that installing the logger twice is harmless.
#[test]
fn test_try_init_logger_twice() {
    try_init_logger();
    try_init_logger();
}

/// Tests that a throttle caps messages within its window.
#[test]
fn test_throttle_caps_burst() {
    let mut throttle = LogThrottle::new(60_000, 2);
    assert!(throttle.allow());
    assert!(throttle.allow());
    assert!(!throttle.allow());
    assert_eq!(throttle.suppressed(), 1);

    throttle.reset();
    assert!(throttle.allow());
}
