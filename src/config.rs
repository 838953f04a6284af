//! # Driver Configuration
//!
//! Wiring, serial defaults and timing for one module, loadable from JSON:
//!
//! ```json
//! {
//!   "serial_port": "/dev/ttyS0",
//!   "pins": { "m0": 23, "m1": 24, "aux": 25 },
//!   "serial": { "baud_rate": 9600, "parity": "none" },
//!   "timing": { "wait_timeout_ms": 2000, "mode_settle_ms": 200 }
//! }
//! ```
//!
//! Every field is optional; missing fields take the datasheet defaults.

use crate::constants::{
    DEFAULT_WAIT_TIMEOUT, MODE_SETTLE_TIME, POWER_ON_SETTLE_TIME, READ_BUFFER_SIZE,
    RESPONSE_DELAY, WRITE_SETTLE_TIME,
};
use crate::error::EbyteError;
use crate::hal::SerialSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Serialise a `Duration` as integer milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// BCM GPIO numbers of the control lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioPins {
    /// M0 mode-select output
    pub m0: u8,
    /// M1 mode-select output
    pub m1: u8,
    /// AUX busy input
    pub aux: u8,
}

impl Default for GpioPins {
    fn default() -> Self {
        Self {
            m0: 23,  // GPIO 23 (Pin 16)
            m1: 24,  // GPIO 24 (Pin 18)
            aux: 25, // GPIO 25 (Pin 22)
        }
    }
}

/// Bounded waits and settle delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Busy-free wait, write and mode-switch acknowledgements
    #[serde(rename = "wait_timeout_ms", with = "millis")]
    pub wait_timeout: Duration,
    /// One serial read
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
    #[serde(rename = "write_settle_ms", with = "millis")]
    pub write_settle: Duration,
    #[serde(rename = "mode_settle_ms", with = "millis")]
    pub mode_settle: Duration,
    /// Delay between a register command and reading its response
    #[serde(rename = "response_delay_ms", with = "millis")]
    pub response_delay: Duration,
    #[serde(rename = "power_on_settle_ms", with = "millis")]
    pub power_on_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            read_timeout: DEFAULT_WAIT_TIMEOUT,
            write_settle: WRITE_SETTLE_TIME,
            mode_settle: MODE_SETTLE_TIME,
            response_delay: RESPONSE_DELAY,
            power_on_settle: POWER_ON_SETTLE_TIME,
        }
    }
}

impl Timing {
    /// Same timing with every value scaled down to `wait` / `settle`.
    ///
    /// Used by tests and simulations where the datasheet delays only slow
    /// things down.
    pub fn fast(wait: Duration, settle: Duration) -> Self {
        Self {
            wait_timeout: wait,
            read_timeout: wait,
            write_settle: settle,
            mode_settle: settle,
            response_delay: settle,
            power_on_settle: settle,
        }
    }
}

/// Complete configuration of one attached module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial device path (e.g., "/dev/ttyS0" on a Raspberry Pi 4)
    pub serial_port: String,
    pub pins: GpioPins,
    /// Settings used to open the link; the module needs 9600 8N1 in sleep mode
    pub serial: SerialSettings,
    pub timing: Timing,
    pub read_buffer_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyS0".to_string(),
            pins: GpioPins::default(),
            serial: SerialSettings::COMMAND_MODE,
            timing: Timing::default(),
            read_buffer_size: READ_BUFFER_SIZE,
        }
    }
}

impl DeviceConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, EbyteError> {
        let config: DeviceConfig =
            serde_json::from_str(json).map_err(|e| EbyteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EbyteError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EbyteError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, EbyteError> {
        serde_json::to_string_pretty(self).map_err(|e| EbyteError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EbyteError> {
        let GpioPins { m0, m1, aux } = self.pins;
        if m0 == m1 || m0 == aux || m1 == aux {
            return Err(EbyteError::Config(format!(
                "M0, M1 and AUX must use distinct GPIOs (got {m0}, {m1}, {aux})"
            )));
        }
        if self.serial_port.is_empty() {
            return Err(EbyteError::Config("serial port path is empty".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(EbyteError::Config("read buffer size must be non-zero".into()));
        }
        if self.timing.wait_timeout.is_zero() || self.timing.read_timeout.is_zero() {
            return Err(EbyteError::Config("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
