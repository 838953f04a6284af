//! # Logging Utilities
//!
//! Rate limiting for repeated background failures, bounded hex dumps of
//! serial traffic and optional tracing spans around frame decoding.
//!
//! ```rust
//! use ebyte_rs::util::logging::{log_frame_hex, LogThrottle};
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("Background read failed");
//! }
//! log_frame_hex("TX", &[0xC1, 0x00, 0x06]);
//! ```

use std::time::{Duration, Instant};

/// At most `cap` messages per `window_ms`
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    cap: u32,
    count: u32,
    t0: Instant,
}

impl LogThrottle {
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            cap,
            count: 0,
            t0: Instant::now(),
        }
    }

    /// Whether the next message may be logged; the count restarts each window.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0) > self.window {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        self.count <= self.cap
    }

    /// Messages suppressed in the current window
    pub fn suppressed(&self) -> u32 {
        self.count.saturating_sub(self.cap)
    }

    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Log serial traffic as compact hex at debug level.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::debug!(target: "ebyte::frame", "{prefix}: {hex_str}{suffix}");
}

/// Enter a span covering one frame decode.
#[cfg(feature = "tracing")]
pub fn span_frame(kind: &str) -> tracing::span::EnteredSpan {
    tracing::debug_span!("frame", kind = kind).entered()
}

#[cfg(not(feature = "tracing"))]
pub fn span_frame(_kind: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_throttle_cap() {
        let mut throttle = LogThrottle::new(1000, 3);
        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.suppressed(), 2);
    }

    #[test]
    fn test_log_throttle_reset() {
        let mut throttle = LogThrottle::new(1000, 1);
        assert!(throttle.allow());
        assert!(!throttle.allow());

        throttle.reset();
        assert!(throttle.allow());
    }

    #[test]
    fn test_log_throttle_window_expiry() {
        let mut throttle = LogThrottle::new(5, 1);
        assert!(throttle.allow());
        assert!(!throttle.allow());

        std::thread::sleep(Duration::from_millis(10));
        assert!(throttle.allow());
    }
}
