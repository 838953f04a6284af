//! EByte E22 Protocol Constants
//!
//! Command bytes, register layout sizes and the timing values mandated by the
//! module datasheet.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Command bytes
// ----------------------------------------------------------------------------

/// Write registers, kept across power cycles
pub const CMD_SET_REGISTERS_PERMANENT: u8 = 0xC0;

/// Read registers
pub const CMD_GET_REGISTERS: u8 = 0xC1;

/// Write registers, lost on power cycle
pub const CMD_SET_REGISTERS_TEMPORARY: u8 = 0xC2;

/// Command, start address and parameter count precede the parameters
pub const FRAME_HEADER_LEN: usize = 3;

/// Shortest response that carries at least one parameter
pub const MIN_RESPONSE_LEN: usize = FRAME_HEADER_LEN + 1;

// ----------------------------------------------------------------------------
// Register layout
// ----------------------------------------------------------------------------

/// Number of configuration registers on the module
pub const REGISTER_COUNT: usize = 8;

/// Registers the host can read back (the crypto pair is write-only)
pub const READABLE_REGISTER_COUNT: u8 = 6;

/// Highest supported channel (81 channels, 0-80)
pub const MAX_CHANNEL: u8 = 80;

/// Frequency of channel 0 in MHz
pub const BASE_FREQUENCY_MHZ: f64 = 850.125;

/// Channel spacing in MHz
pub const CHANNEL_SPACING_MHZ: f64 = 1.0;

// ----------------------------------------------------------------------------
// Serial link
// ----------------------------------------------------------------------------

/// Baud rate the module requires for command access in sleep mode
pub const COMMAND_MODE_BAUD_RATE: u32 = 9600;

/// Size of the buffer used for one serial read
pub const READ_BUFFER_SIZE: usize = 512;

// ----------------------------------------------------------------------------
// Timing
// ----------------------------------------------------------------------------

/// Upper bound for every busy-line wait and serial read
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// The module needs 2ms after the AUX rising edge before it accepts new input
pub const WRITE_SETTLE_TIME: Duration = Duration::from_millis(2);

/// Wait after the AUX edge that completes a mode transition
pub const MODE_SETTLE_TIME: Duration = Duration::from_millis(200);

/// Delay between sending a register command and reading its response
pub const RESPONSE_DELAY: Duration = Duration::from_millis(200);

/// Delay after opening the link before the first command
pub const POWER_ON_SETTLE_TIME: Duration = Duration::from_millis(200);
