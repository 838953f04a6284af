//! # ebyte-rs - Host-side Driver for EByte E22 UART Radio Modules
//!
//! The ebyte-rs crate drives EByte E22 LoRa modules attached over a UART
//! and three GPIO lines: M0 and M1 select the operating mode, AUX signals
//! when the module is busy.
//!
//! ## Features
//!
//! - Mode switching over M0/M1 with the serial link reconfigured for sleep mode
//! - Writes, mode switches and reads serialized against AUX edge interrupts
//! - Typed register model with a human-readable configuration report
//! - Register read (0xC1) and permanent/temporary write (0xC0/0xC2) codec
//! - Write-then-verify configuration commits through a chained builder
//! - Transparent and fixed-address message transmission with RSSI decoding
//! - Raspberry Pi binding via `rppal` and `tokio-serial` (feature `raspberry-pi`)
//! - A simulated module for testing without hardware
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! ebyte-rs = { version = "0.1.0", features = ["raspberry-pi"] }
//! ```
//!
//! ```rust,no_run
//! # #[cfg(feature = "raspberry-pi")]
//! # async fn example() -> Result<(), ebyte_rs::EbyteError> {
//! use std::sync::Arc;
//! use ebyte_rs::{ChipMode, DeviceConfig, E22Module, HwHandler};
//!
//! let handler = Arc::new(HwHandler::open_raspberry_pi(&DeviceConfig::default()).await?);
//! let module = E22Module::new(handler, Box::new(|message| match message {
//!     Ok(message) => println!("received {:?} (RSSI {:?})", message.payload, message.rssi_dbm()),
//!     Err(e) => eprintln!("receive failed: {e}"),
//! }))
//! .await?;
//!
//! module.set_mode(ChipMode::Normal).await?;
//! module.send_message(b"hello").await?;
//! module.config_builder().channel(23).write_temporary().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod e22;
pub mod error;
pub mod hal;
pub mod logging;
pub mod util;

pub use crate::config::{DeviceConfig, GpioPins, Timing};
pub use crate::error::{EbyteError, TimeoutKind};
pub use crate::logging::{init_logger, log_info};

pub use e22::{ConfigBuilder, E22Module, Message, MessageCallback, RegisterBank};
pub use hal::{ChipMode, HwHandler, ModuleHardware, Parity, SerialSettings};
