//! Staged configuration changes.
//!
//! ```rust,no_run
//! # use ebyte_rs::e22::{E22Module, TransmissionMethod};
//! # use ebyte_rs::hal::ModuleHardware;
//! # async fn example<H: ModuleHardware>(module: &E22Module<H>) -> Result<(), ebyte_rs::EbyteError> {
//! module
//!     .config_builder()
//!     .channel(23)
//!     .rssi(true)
//!     .transmission(TransmissionMethod::Fixed)
//!     .write_temporary()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::e22::module::E22Module;
use crate::e22::registers::{
    AirDataRate, RegisterBank, SubPacketSize, TransmissionMethod, TransmitPower, UartBaudRate,
    UartParity, WorCycle,
};
use crate::error::EbyteError;
use crate::hal::{ChipMode, ModuleHardware};

/// Copy of the module's registers with chained setters; nothing reaches the
/// module until `write_permanent` or `write_temporary`.
pub struct ConfigBuilder<'a, H: ModuleHardware> {
    module: &'a E22Module<H>,
    staged: RegisterBank,
    next_mode: Option<ChipMode>,
}

impl<'a, H: ModuleHardware> ConfigBuilder<'a, H> {
    pub fn new(module: &'a E22Module<H>) -> Self {
        Self {
            module,
            staged: module.configuration(),
            next_mode: None,
        }
    }

    pub fn address(mut self, address_high: u8, address_low: u8) -> Self {
        self.staged.address_high = address_high;
        self.staged.address_low = address_low;
        self
    }

    pub fn baud_rate(mut self, baud_rate: UartBaudRate) -> Self {
        self.staged.reg0.baud_rate = baud_rate;
        self
    }

    pub fn parity(mut self, parity: UartParity) -> Self {
        self.staged.reg0.parity = parity;
        self
    }

    pub fn air_data_rate(mut self, rate: AirDataRate) -> Self {
        self.staged.reg0.air_data_rate = rate;
        self
    }

    pub fn sub_packet(mut self, size: SubPacketSize) -> Self {
        self.staged.reg1.sub_packet = size;
        self
    }

    pub fn ambient_noise_rssi(mut self, enabled: bool) -> Self {
        self.staged.reg1.ambient_noise_rssi = enabled;
        self
    }

    pub fn transmit_power(mut self, power: TransmitPower) -> Self {
        self.staged.reg1.transmit_power = power;
        self
    }

    /// Channels above 80 are clamped to 80.
    pub fn channel(mut self, channel: u8) -> Self {
        self.staged.reg2.set_value(channel);
        self
    }

    /// Append an RSSI byte to received packets.
    pub fn rssi(mut self, enabled: bool) -> Self {
        self.staged.reg3.rssi_enabled = enabled;
        self
    }

    pub fn transmission(mut self, method: TransmissionMethod) -> Self {
        self.staged.reg3.transmission = method;
        self
    }

    pub fn lbt(mut self, enabled: bool) -> Self {
        self.staged.reg3.lbt_enabled = enabled;
        self
    }

    pub fn wor_cycle(mut self, cycle: WorCycle) -> Self {
        self.staged.reg3.wor_cycle = cycle;
        self
    }

    /// Key shared with the other side; it cannot be read back.
    pub fn crypt(mut self, crypt_high: u8, crypt_low: u8) -> Self {
        self.staged.crypt_high.set_value(crypt_high);
        self.staged.crypt_low.set_value(crypt_low);
        self
    }

    /// Mode to enter after a successful write instead of the current one.
    pub fn next_mode(mut self, mode: ChipMode) -> Self {
        self.next_mode = Some(mode);
        self
    }

    pub fn staged(&self) -> &RegisterBank {
        &self.staged
    }

    /// Write and keep the configuration across power cycles.
    pub async fn write_permanent(self) -> Result<(), EbyteError> {
        self.module.commit(false, &self.staged, self.next_mode).await
    }

    /// Write the configuration until the next power cycle.
    pub async fn write_temporary(self) -> Result<(), EbyteError> {
        self.module.commit(true, &self.staged, self.next_mode).await
    }
}
