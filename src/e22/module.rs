//! # E22 Device Controller
//!
//! `E22Module` keeps a live copy of the module's registers, turns inbound
//! packets into `Message`s, enforces the transmit rules of the current mode
//! and runs the write-then-verify transaction for configuration changes.

use crate::config::Timing;
use crate::e22::config_builder::ConfigBuilder;
use crate::e22::protocol::{
    decode_message, encode_get_request, encode_set_request, parse_response, ChipResponse, Message,
};
use crate::e22::registers::{RegisterBank, TransmissionMethod};
use crate::error::EbyteError;
use crate::hal::{ChipMode, ModuleHardware};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

/// Receives every decoded inbound packet, or the error that prevented decoding
pub type MessageCallback = Box<dyn Fn(Result<Message, EbyteError>) + Send + Sync>;

fn lock(bank: &Mutex<RegisterBank>) -> MutexGuard<'_, RegisterBank> {
    bank.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controller for one E22 module
pub struct E22Module<H: ModuleHardware> {
    hw: Arc<H>,
    registers: Arc<Mutex<RegisterBank>>,
    commit: AsyncMutex<()>,
    timing: Timing,
}

impl<H: ModuleHardware> E22Module<H> {
    /// Read the module's registers and adopt its serial settings.
    ///
    /// The module is put to sleep for the register read and returned to the
    /// mode it was found in. Any failure aborts construction.
    pub async fn new(hw: Arc<H>, on_message: MessageCallback) -> Result<Self, EbyteError> {
        Self::with_timing(hw, on_message, Timing::default()).await
    }

    pub async fn with_timing(
        hw: Arc<H>,
        on_message: MessageCallback,
        timing: Timing,
    ) -> Result<Self, EbyteError> {
        let mode = hw.mode()?;
        let registers = Arc::new(Mutex::new(RegisterBank::default()));

        let bank = registers.clone();
        hw.register_message_callback(Box::new(move |raw| {
            let result = match raw {
                Ok(data) => {
                    let rssi_enabled = lock(&bank).reg3.rssi_enabled;
                    decode_message(&data, rssi_enabled)
                }
                Err(e) if e.is_idle() => return,
                Err(e) => Err(e),
            };
            on_message(result);
        }))?;

        let module = Self {
            hw,
            registers,
            commit: AsyncMutex::new(()),
            timing,
        };

        let response = module.query_registers().await?;
        module.store(&response)?;
        module.hw.set_mode(mode).await?;

        let bank = module.configuration();
        info!(
            "E22 module {:#06x} ready: channel {}, UART {}",
            bank.address(),
            bank.reg2.channel(),
            bank.serial_settings()
        );
        Ok(module)
    }

    async fn query_registers(&self) -> Result<ChipResponse, EbyteError> {
        self.hw.set_mode(ChipMode::Sleep).await?;
        self.hw.write_serial(&encode_get_request()).await?;
        sleep(self.timing.response_delay).await;
        let raw = self.hw.read_serial().await?;
        parse_response(&raw)
    }

    /// Adopt a register echo and stage the serial settings it implies.
    fn store(&self, response: &ChipResponse) -> Result<(), EbyteError> {
        let settings = {
            let mut bank = lock(&self.registers);
            response.apply_to(&mut bank)?;
            bank.serial_settings()
        };
        self.hw.stage_serial_settings(settings);
        Ok(())
    }

    /// Snapshot of the registers as last read from the module.
    pub fn configuration(&self) -> RegisterBank {
        *lock(&self.registers)
    }

    /// Human-readable dump of the current registers.
    pub fn configuration_report(&self) -> String {
        self.configuration().to_string()
    }

    pub fn mode(&self) -> Result<ChipMode, EbyteError> {
        self.hw.mode()
    }

    pub async fn set_mode(&self, mode: ChipMode) -> Result<(), EbyteError> {
        self.hw.set_mode(mode).await
    }

    pub fn hardware(&self) -> &Arc<H> {
        &self.hw
    }

    /// Stage changes against a copy of the current registers.
    pub fn config_builder(&self) -> ConfigBuilder<'_, H> {
        ConfigBuilder::new(self)
    }

    fn ensure_can_transmit(&self) -> Result<(), EbyteError> {
        let mode = self.hw.mode()?;
        if mode.can_transmit() {
            Ok(())
        } else {
            Err(EbyteError::State(format!(
                "cannot transmit in {mode} mode, switch to normal or wake-up"
            )))
        }
    }

    /// Transmit `payload` as is.
    pub async fn send_message(&self, payload: &[u8]) -> Result<(), EbyteError> {
        self.ensure_can_transmit()?;
        self.hw.write_serial(payload).await
    }

    /// Transmit `payload` to one address and channel; needs fixed transmission.
    pub async fn send_fixed_message(
        &self,
        address_high: u8,
        address_low: u8,
        channel: u8,
        payload: &[u8],
    ) -> Result<(), EbyteError> {
        self.ensure_can_transmit()?;
        if self.configuration().reg3.transmission == TransmissionMethod::Transparent {
            return Err(EbyteError::State(
                "fixed-address send requires fixed transmission mode".into(),
            ));
        }

        let mut frame = Vec::with_capacity(3 + payload.len());
        frame.extend([address_high, address_low, channel]);
        frame.extend_from_slice(payload);
        self.hw.write_serial(&frame).await
    }

    /// Write `staged` to the module and verify the echo.
    ///
    /// On success the module is returned to the mode it was in. After any
    /// failure the live registers hold whatever was last decoded; query them
    /// again before relying on them.
    pub async fn write_config(&self, temporary: bool, staged: &RegisterBank) -> Result<(), EbyteError> {
        self.commit(temporary, staged, None).await
    }

    pub(crate) async fn commit(
        &self,
        temporary: bool,
        staged: &RegisterBank,
        next_mode: Option<ChipMode>,
    ) -> Result<(), EbyteError> {
        let _commit = self.commit.lock().await;
        if *staged == self.configuration() {
            return Err(EbyteError::NoOp);
        }

        let mode = self.hw.mode()?;
        self.hw.set_mode(ChipMode::Sleep).await?;

        let frame = encode_set_request(staged, temporary);
        debug!(
            "Writing {} configuration ({} registers)",
            if temporary { "temporary" } else { "permanent" },
            frame.len() - 3
        );
        self.hw.write_serial(&frame).await?;
        sleep(self.timing.response_delay).await;

        let raw = self.hw.read_serial().await?;
        let response = parse_response(&raw)?;
        self.store(&response)?;

        let actual = self.configuration();
        if actual != *staged {
            warn!("Module echo does not match the written configuration");
            return Err(EbyteError::Integrity {
                expected: staged.values(),
                actual: actual.values(),
            });
        }

        self.hw.set_mode(next_mode.unwrap_or(mode)).await?;
        info!("Configuration written and verified");
        Ok(())
    }
}
