//! # Hardware Abstraction Layer for UART Radio Modules
//!
//! This module defines the seams between the driver and the hardware: the
//! serial transport, the three control lines (M0, M1 and AUX) and the
//! `ModuleHardware` interface the device controller is written against.
//!
//! ## Line conventions
//!
//! Line values follow the Linux GPIO character device: `0` is low, `1` is
//! high. The AUX line reads low while the module is busy and produces a
//! rising edge when it becomes ready again.

use crate::error::EbyteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tokio::sync::mpsc;

pub mod handler;
pub mod mock;
pub mod mode;
pub mod serial;

#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

pub use handler::HwHandler;
pub use mode::ChipMode;
pub use serial::TokioSerialTransport;

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::RaspberryPiLines;

/// Logical low line value
pub const LINE_LOW: u8 = 0;

/// Logical high line value
pub const LINE_HIGH: u8 = 1;

/// Serial parity setting of the host link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        write!(f, "{c}")
    }
}

/// Baud rate and parity of the host-side serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub parity: Parity,
}

impl SerialSettings {
    /// Settings the module requires for register access in sleep mode
    pub const COMMAND_MODE: SerialSettings = SerialSettings {
        baud_rate: crate::constants::COMMAND_MODE_BAUD_RATE,
        parity: Parity::None,
    };

    pub const fn new(baud_rate: u32, parity: Parity) -> Self {
        Self { baud_rate, parity }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::COMMAND_MODE
    }
}

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 8{}1", self.baud_rate, self.parity)
    }
}

/// A rising edge observed on the AUX line
#[derive(Debug, Clone, Copy)]
pub struct BusyEdge {
    pub timestamp: Instant,
}

impl BusyEdge {
    pub fn now() -> Self {
        Self {
            timestamp: Instant::now(),
        }
    }
}

/// Sending half of the edge queue drained by the handler's coordinator task
pub type EdgeSender = mpsc::UnboundedSender<BusyEdge>;

/// Callback receiving raw inbound bytes (or a read error) from background reads
pub type RawMessageCallback = Box<dyn Fn(Result<Vec<u8>, EbyteError>) + Send + Sync>;

/// The module's UART; every open yields independent read and write halves
///
/// Reads and writes are locked separately by the handler, so a read waiting
/// for data never holds up a write.
#[async_trait]
pub trait SerialTransport: Send + 'static {
    type Reader: SerialReader;
    type Writer: SerialWriter;

    /// Open the link with `settings`.
    ///
    /// The caller drops the halves of any earlier open first.
    async fn open(
        &mut self,
        settings: SerialSettings,
    ) -> Result<(Self::Reader, Self::Writer), EbyteError>;
}

/// Receiving half of an open link
#[async_trait]
pub trait SerialReader: Send + 'static {
    /// Read whatever is available into `buf`, returning the byte count.
    ///
    /// The caller bounds this call with its own timeout.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, EbyteError>;
}

/// Sending half of an open link
#[async_trait]
pub trait SerialWriter: Send + 'static {
    /// Write all of `data` and flush it.
    async fn write_all(&mut self, data: &[u8]) -> Result<(), EbyteError>;

    /// Flush before the halves are dropped.
    async fn close(&mut self) -> Result<(), EbyteError> {
        Ok(())
    }
}

/// The M0/M1 mode-select outputs and the AUX busy input
pub trait ControlLines: Send + 'static {
    /// Current (M0, M1) output values.
    fn mode_levels(&self) -> Result<(u8, u8), EbyteError>;

    /// Drive M0 and M1.
    fn set_mode_levels(&mut self, m0: u8, m1: u8) -> Result<(), EbyteError>;

    /// Current AUX value; `LINE_HIGH` means the module is free.
    fn busy_level(&self) -> Result<u8, EbyteError>;

    /// Deliver every AUX rising edge to `edges`.
    fn watch_busy_edges(&mut self, edges: EdgeSender) -> Result<(), EbyteError>;

    /// Stop edge delivery and release the lines.
    fn release(&mut self) -> Result<(), EbyteError> {
        Ok(())
    }
}

/// Operations the device controller needs from the hardware handler
#[async_trait]
pub trait ModuleHardware: Send + Sync + 'static {
    /// One bounded read from the serial transport.
    async fn read_serial(&self) -> Result<Vec<u8>, EbyteError>;

    /// Write `data`, serialized against the busy line.
    async fn write_serial(&self, data: &[u8]) -> Result<(), EbyteError>;

    /// Switch the chip mode, serialized against the busy line.
    async fn set_mode(&self, mode: ChipMode) -> Result<(), EbyteError>;

    /// Chip mode derived from the live M0/M1 values.
    fn mode(&self) -> Result<ChipMode, EbyteError>;

    /// Record the serial settings to use whenever the chip is not asleep.
    fn stage_serial_settings(&self, settings: SerialSettings);

    /// Register the single inbound message callback.
    fn register_message_callback(&self, callback: RawMessageCallback) -> Result<(), EbyteError>;
}
