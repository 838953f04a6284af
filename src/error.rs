//! # EByte Driver Error Handling
//!
//! This module defines the `EbyteError` enum, which represents every failure
//! the driver can report to its caller. No error is retried internally; retry
//! policy belongs to the caller.

use std::fmt;
use thiserror::Error;

/// Identifies which bounded wait expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Waiting for the busy (AUX) line to become free before issuing a command.
    BusyFree,
    /// Waiting for the rising edge that acknowledges a serial write.
    WriteAck,
    /// Waiting for the rising edge that acknowledges a mode switch.
    ModeSwitchAck,
    /// Waiting for bytes from the serial transport.
    Read,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeoutKind::BusyFree => "busy line to become free",
            TimeoutKind::WriteAck => "write acknowledgement",
            TimeoutKind::ModeSwitchAck => "mode switch acknowledgement",
            TimeoutKind::Read => "serial read",
        };
        f.write_str(name)
    }
}

/// Represents the different error types that can occur in the driver.
#[derive(Debug, Error)]
pub enum EbyteError {
    /// Open, read or write failure at the serial layer, or a line-level I/O failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A bounded wait expired.
    #[error("Timeout waiting for {0}")]
    Timeout(TimeoutKind),

    /// The transport returned no bytes.
    #[error("End of stream")]
    EndOfStream,

    /// A device response or inbound message does not have the expected layout.
    #[error("Framing error: {0}")]
    Framing(String),

    /// The mode-select lines read back a combination that maps to no chip mode.
    #[error("Undefined chip mode (M0={m0}, M1={m1}), check wiring")]
    UndefinedMode { m0: u8, m1: u8 },

    /// The operation is not allowed in the module's current state.
    #[error("Invalid state: {0}")]
    State(String),

    /// A message callback is already registered on this handler.
    #[error("Message callback already registered")]
    DuplicateCallback,

    /// The staged configuration is identical to the configuration on the chip.
    #[error("Staged configuration matches the chip configuration, nothing to write")]
    NoOp,

    /// The configuration read back after a write differs from what was written.
    #[error("Configuration verification failed: expected {expected:02X?}, chip reports {actual:02X?}")]
    Integrity { expected: [u8; 8], actual: [u8; 8] },

    /// Invalid or unreadable driver configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EbyteError {
    /// Returns true for conditions that mean "the transport is idle" rather
    /// than a real failure.
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            EbyteError::EndOfStream | EbyteError::Timeout(TimeoutKind::Read)
        )
    }

    /// Returns true if this error is a timeout of any kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EbyteError::Timeout(_))
    }
}

impl From<std::io::Error> for EbyteError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            EbyteError::EndOfStream
        } else {
            EbyteError::Transport(e.to_string())
        }
    }
}

impl From<tokio_serial::Error> for EbyteError {
    fn from(e: tokio_serial::Error) -> Self {
        EbyteError::Transport(e.to_string())
    }
}

#[cfg(feature = "raspberry-pi")]
impl From<rppal::gpio::Error> for EbyteError {
    fn from(e: rppal::gpio::Error) -> Self {
        EbyteError::Transport(format!("GPIO: {e}"))
    }
}

impl<I: fmt::Debug> From<nom::Err<nom::error::Error<I>>> for EbyteError {
    fn from(e: nom::Err<nom::error::Error<I>>) -> Self {
        match e {
            nom::Err::Incomplete(needed) => {
                EbyteError::Framing(format!("incomplete frame: {needed:?}"))
            }
            nom::Err::Error(err) | nom::Err::Failure(err) => {
                EbyteError::Framing(format!("{:?}", err.code))
            }
        }
    }
}
