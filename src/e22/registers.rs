//! # E22 Register Model
//!
//! The module exposes eight one-byte configuration registers:
//!
//! ```text
//! Addr │ Name    │ Bits
//! ─────┼─────────┼──────────────────────────────────────────────────────────
//! 00H  │ ADDH    │ module address, high byte
//! 01H  │ ADDL    │ module address, low byte
//! 02H  │ REG0    │ 7-5 UART baud │ 4-3 UART parity │ 2-0 air data rate
//! 03H  │ REG1    │ 7-6 sub-packet │ 5 ambient RSSI │ 4-2 reserved │ 1-0 power
//! 04H  │ REG2    │ channel 0-80 (850.125 MHz + channel × 1 MHz)
//! 05H  │ REG3    │ 7 packet RSSI │ 6 fixed │ 5-4 reserved │ 3 LBT │ 2-0 WOR
//! 06H  │ CRYPT_H │ key high byte (write-only)
//! 07H  │ CRYPT_L │ key low byte (write-only)
//! ```
//!
//! Reserved bits are carried through untouched so every register value
//! survives a `set_value`/`value` round trip.

use crate::constants::{BASE_FREQUENCY_MHZ, CHANNEL_SPACING_MHZ, MAX_CHANNEL, REGISTER_COUNT};
use crate::error::EbyteError;
use crate::hal::{Parity, SerialSettings};
use std::fmt;

/// Declares a register bit field: one variant per code under `mask`.
macro_rules! bit_field {
    (
        $(#[$meta:meta])*
        $name:ident, mask = $mask:expr, {
            $($(#[$vmeta:meta])* $variant:ident = $bits:expr => $label:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const MASK: u8 = $mask;
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Field bits in register position
            pub const fn bits(self) -> u8 {
                match self {
                    $($name::$variant => $bits),+
                }
            }

            /// Decode the field from a full register value.
            pub fn from_bits(value: u8) -> Self {
                let bits = value & Self::MASK;
                Self::ALL
                    .iter()
                    .copied()
                    .find(|field| field.bits() == bits)
                    .unwrap_or(Self::ALL[0])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::from_bits(0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let label = match self {
                    $($name::$variant => $label),+
                };
                f.write_str(label)
            }
        }
    };
}

bit_field! {
    /// UART baud rate between host and module (REG0 bits 7-5)
    UartBaudRate, mask = 0xE0, {
        Baud1200 = 0x00 => "1200 bps",
        Baud2400 = 0x20 => "2400 bps",
        Baud4800 = 0x40 => "4800 bps",
        Baud9600 = 0x60 => "9600 bps",
        Baud19200 = 0x80 => "19200 bps",
        Baud38400 = 0xA0 => "38400 bps",
        Baud57600 = 0xC0 => "57600 bps",
        Baud115200 = 0xE0 => "115200 bps",
    }
}

impl UartBaudRate {
    pub const fn baud(self) -> u32 {
        match self {
            UartBaudRate::Baud1200 => 1200,
            UartBaudRate::Baud2400 => 2400,
            UartBaudRate::Baud4800 => 4800,
            UartBaudRate::Baud9600 => 9600,
            UartBaudRate::Baud19200 => 19200,
            UartBaudRate::Baud38400 => 38400,
            UartBaudRate::Baud57600 => 57600,
            UartBaudRate::Baud115200 => 115200,
        }
    }

    pub fn from_baud(baud: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|rate| rate.baud() == baud)
    }
}

bit_field! {
    /// UART parity (REG0 bits 4-3)
    UartParity, mask = 0x18, {
        Parity8N1 = 0x00 => "8N1",
        Parity8O1 = 0x08 => "8O1",
        Parity8E1 = 0x10 => "8E1",
        /// Code 11; the module treats it as 8N1
        Parity8N1Alt = 0x18 => "8N1 (code 11)",
    }
}

impl UartParity {
    pub const fn serial_parity(self) -> Parity {
        match self {
            UartParity::Parity8N1 | UartParity::Parity8N1Alt => Parity::None,
            UartParity::Parity8O1 => Parity::Odd,
            UartParity::Parity8E1 => Parity::Even,
        }
    }
}

impl From<Parity> for UartParity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => UartParity::Parity8N1,
            Parity::Odd => UartParity::Parity8O1,
            Parity::Even => UartParity::Parity8E1,
        }
    }
}

bit_field! {
    /// Over-the-air data rate (REG0 bits 2-0)
    AirDataRate, mask = 0x07, {
        /// Code 000, same rate as `Kbps2_4`
        Kbps2_4Code0 = 0x00 => "2.4 kbps (code 000)",
        /// Code 001, same rate as `Kbps2_4`
        Kbps2_4Code1 = 0x01 => "2.4 kbps (code 001)",
        Kbps2_4 = 0x02 => "2.4 kbps",
        Kbps4_8 = 0x03 => "4.8 kbps",
        Kbps9_6 = 0x04 => "9.6 kbps",
        Kbps19_2 = 0x05 => "19.2 kbps",
        Kbps38_4 = 0x06 => "38.4 kbps",
        Kbps62_5 = 0x07 => "62.5 kbps",
    }
}

impl AirDataRate {
    pub const fn bps(self) -> u32 {
        match self {
            AirDataRate::Kbps2_4Code0 | AirDataRate::Kbps2_4Code1 | AirDataRate::Kbps2_4 => 2400,
            AirDataRate::Kbps4_8 => 4800,
            AirDataRate::Kbps9_6 => 9600,
            AirDataRate::Kbps19_2 => 19200,
            AirDataRate::Kbps38_4 => 38400,
            AirDataRate::Kbps62_5 => 62500,
        }
    }
}

bit_field! {
    /// Maximum sub-packet length (REG1 bits 7-6)
    SubPacketSize, mask = 0xC0, {
        Bytes200 = 0x00 => "200 bytes",
        Bytes128 = 0x40 => "128 bytes",
        Bytes64 = 0x80 => "64 bytes",
        Bytes32 = 0xC0 => "32 bytes",
    }
}

impl SubPacketSize {
    pub const fn bytes(self) -> usize {
        match self {
            SubPacketSize::Bytes200 => 200,
            SubPacketSize::Bytes128 => 128,
            SubPacketSize::Bytes64 => 64,
            SubPacketSize::Bytes32 => 32,
        }
    }
}

bit_field! {
    /// Transmit power (REG1 bits 1-0)
    TransmitPower, mask = 0x03, {
        Dbm22 = 0x00 => "22 dBm",
        Dbm17 = 0x01 => "17 dBm",
        Dbm13 = 0x02 => "13 dBm",
        Dbm10 = 0x03 => "10 dBm",
    }
}

impl TransmitPower {
    pub const fn dbm(self) -> u8 {
        match self {
            TransmitPower::Dbm22 => 22,
            TransmitPower::Dbm17 => 17,
            TransmitPower::Dbm13 => 13,
            TransmitPower::Dbm10 => 10,
        }
    }
}

bit_field! {
    /// Addressing of outgoing packets (REG3 bit 6)
    TransmissionMethod, mask = 0x40, {
        /// Payload is broadcast as is
        Transparent = 0x00 => "transparent",
        /// First three payload bytes select target address and channel
        Fixed = 0x40 => "fixed",
    }
}

bit_field! {
    /// Wake-on-radio listening period (REG3 bits 2-0)
    WorCycle, mask = 0x07, {
        Ms500 = 0x00 => "500 ms",
        Ms1000 = 0x01 => "1000 ms",
        Ms1500 = 0x02 => "1500 ms",
        Ms2000 = 0x03 => "2000 ms",
        Ms2500 = 0x04 => "2500 ms",
        Ms3000 = 0x05 => "3000 ms",
        Ms3500 = 0x06 => "3500 ms",
        Ms4000 = 0x07 => "4000 ms",
    }
}

impl WorCycle {
    pub const fn millis(self) -> u32 {
        (self.bits() as u32 + 1) * 500
    }
}

/// REG0: serial link and air data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reg0 {
    pub baud_rate: UartBaudRate,
    pub parity: UartParity,
    pub air_data_rate: AirDataRate,
}

impl Reg0 {
    pub fn from_value(value: u8) -> Self {
        let mut reg = Self::default();
        reg.set_value(value);
        reg
    }

    pub const fn value(&self) -> u8 {
        self.baud_rate.bits() | self.parity.bits() | self.air_data_rate.bits()
    }

    pub fn set_value(&mut self, value: u8) {
        self.baud_rate = UartBaudRate::from_bits(value);
        self.parity = UartParity::from_bits(value);
        self.air_data_rate = AirDataRate::from_bits(value);
    }

    /// Host link settings matching this register
    pub const fn serial_settings(&self) -> SerialSettings {
        SerialSettings::new(self.baud_rate.baud(), self.parity.serial_parity())
    }
}

/// REG1: packetisation and transmit power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reg1 {
    pub sub_packet: SubPacketSize,
    pub ambient_noise_rssi: bool,
    reserved: u8,
    pub transmit_power: TransmitPower,
}

impl Reg1 {
    const AMBIENT_NOISE_RSSI: u8 = 0x20;
    const RESERVED: u8 = 0x1C;

    pub fn from_value(value: u8) -> Self {
        let mut reg = Self::default();
        reg.set_value(value);
        reg
    }

    pub const fn value(&self) -> u8 {
        let rssi = if self.ambient_noise_rssi {
            Self::AMBIENT_NOISE_RSSI
        } else {
            0
        };
        self.sub_packet.bits() | rssi | self.reserved | self.transmit_power.bits()
    }

    pub fn set_value(&mut self, value: u8) {
        self.sub_packet = SubPacketSize::from_bits(value);
        self.ambient_noise_rssi = value & Self::AMBIENT_NOISE_RSSI != 0;
        self.reserved = value & Self::RESERVED;
        self.transmit_power = TransmitPower::from_bits(value);
    }
}

/// REG2: radio channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reg2 {
    channel: u8,
}

impl Reg2 {
    pub fn from_value(value: u8) -> Self {
        let mut reg = Self::default();
        reg.set_value(value);
        reg
    }

    pub const fn value(&self) -> u8 {
        self.channel
    }

    /// Channels above 80 are clamped to 80.
    pub fn set_value(&mut self, value: u8) {
        self.channel = value.min(MAX_CHANNEL);
    }

    pub const fn channel(&self) -> u8 {
        self.channel
    }

    pub fn frequency_mhz(&self) -> f64 {
        BASE_FREQUENCY_MHZ + f64::from(self.channel) * CHANNEL_SPACING_MHZ
    }
}

/// REG3: reception and addressing options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reg3 {
    /// Append an RSSI byte to every received packet
    pub rssi_enabled: bool,
    pub transmission: TransmissionMethod,
    reserved: u8,
    pub lbt_enabled: bool,
    pub wor_cycle: WorCycle,
}

impl Reg3 {
    const RSSI: u8 = 0x80;
    const RESERVED: u8 = 0x30;
    const LBT: u8 = 0x08;

    pub fn from_value(value: u8) -> Self {
        let mut reg = Self::default();
        reg.set_value(value);
        reg
    }

    pub const fn value(&self) -> u8 {
        let rssi = if self.rssi_enabled { Self::RSSI } else { 0 };
        let lbt = if self.lbt_enabled { Self::LBT } else { 0 };
        rssi | self.transmission.bits() | self.reserved | lbt | self.wor_cycle.bits()
    }

    pub fn set_value(&mut self, value: u8) {
        self.rssi_enabled = value & Self::RSSI != 0;
        self.transmission = TransmissionMethod::from_bits(value);
        self.reserved = value & Self::RESERVED;
        self.lbt_enabled = value & Self::LBT != 0;
        self.wor_cycle = WorCycle::from_bits(value);
    }
}

/// One write-only key byte; the stored value never reads back.
#[derive(Clone, Copy, Default)]
pub struct CryptByte(u8);

impl CryptByte {
    pub const fn new(key: u8) -> Self {
        Self(key)
    }

    /// Always 0, like the module.
    pub const fn value(&self) -> u8 {
        0
    }

    pub fn set_value(&mut self, key: u8) {
        self.0 = key;
    }

    pub(crate) const fn key(&self) -> u8 {
        self.0
    }
}

impl fmt::Debug for CryptByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CryptByte(***)")
    }
}

/// Register addresses, equal to the position in the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RegisterAddress {
    AddressHigh = 0x00,
    AddressLow = 0x01,
    Reg0 = 0x02,
    Reg1 = 0x03,
    Reg2 = 0x04,
    Reg3 = 0x05,
    CryptHigh = 0x06,
    CryptLow = 0x07,
}

impl RegisterAddress {
    pub const ALL: [RegisterAddress; REGISTER_COUNT] = [
        RegisterAddress::AddressHigh,
        RegisterAddress::AddressLow,
        RegisterAddress::Reg0,
        RegisterAddress::Reg1,
        RegisterAddress::Reg2,
        RegisterAddress::Reg3,
        RegisterAddress::CryptHigh,
        RegisterAddress::CryptLow,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            RegisterAddress::AddressHigh => "ADDH",
            RegisterAddress::AddressLow => "ADDL",
            RegisterAddress::Reg0 => "REG0",
            RegisterAddress::Reg1 => "REG1",
            RegisterAddress::Reg2 => "REG2",
            RegisterAddress::Reg3 => "REG3",
            RegisterAddress::CryptHigh => "CRYPT_H",
            RegisterAddress::CryptLow => "CRYPT_L",
        }
    }
}

/// The eight configuration registers of one module
///
/// Equality compares the readable values, so key bytes never take part.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterBank {
    pub address_high: u8,
    pub address_low: u8,
    pub reg0: Reg0,
    pub reg1: Reg1,
    pub reg2: Reg2,
    pub reg3: Reg3,
    pub crypt_high: CryptByte,
    pub crypt_low: CryptByte,
}

impl RegisterBank {
    /// A bank with every register set from `values`.
    pub fn from_values(values: [u8; REGISTER_COUNT]) -> Self {
        let mut bank = Self::default();
        for (address, value) in RegisterAddress::ALL.into_iter().zip(values) {
            bank.set(address, value);
        }
        bank
    }

    /// Register value as the module reports it (key bytes read 0).
    pub fn get(&self, address: RegisterAddress) -> u8 {
        match address {
            RegisterAddress::AddressHigh => self.address_high,
            RegisterAddress::AddressLow => self.address_low,
            RegisterAddress::Reg0 => self.reg0.value(),
            RegisterAddress::Reg1 => self.reg1.value(),
            RegisterAddress::Reg2 => self.reg2.value(),
            RegisterAddress::Reg3 => self.reg3.value(),
            RegisterAddress::CryptHigh => self.crypt_high.value(),
            RegisterAddress::CryptLow => self.crypt_low.value(),
        }
    }

    pub fn set(&mut self, address: RegisterAddress, value: u8) {
        match address {
            RegisterAddress::AddressHigh => self.address_high = value,
            RegisterAddress::AddressLow => self.address_low = value,
            RegisterAddress::Reg0 => self.reg0.set_value(value),
            RegisterAddress::Reg1 => self.reg1.set_value(value),
            RegisterAddress::Reg2 => self.reg2.set_value(value),
            RegisterAddress::Reg3 => self.reg3.set_value(value),
            RegisterAddress::CryptHigh => self.crypt_high.set_value(value),
            RegisterAddress::CryptLow => self.crypt_low.set_value(value),
        }
    }

    /// Readable values of all eight registers, in address order.
    pub fn values(&self) -> [u8; REGISTER_COUNT] {
        RegisterAddress::ALL.map(|address| self.get(address))
    }

    /// Store `bytes` into consecutive registers starting at `start`.
    ///
    /// A range running past the last register is rejected and the bank is
    /// left unchanged.
    pub fn update(&mut self, start: u8, bytes: &[u8]) -> Result<(), EbyteError> {
        let start = start as usize;
        if start + bytes.len() > REGISTER_COUNT {
            return Err(EbyteError::Framing(format!(
                "{} register values at address {start:#04x} exceed the {REGISTER_COUNT}-register bank",
                bytes.len()
            )));
        }
        for (address, value) in RegisterAddress::ALL[start..].iter().zip(bytes) {
            self.set(*address, *value);
        }
        Ok(())
    }

    /// Whether either key byte is non-zero.
    pub fn has_crypt_key(&self) -> bool {
        self.crypt_high.key() != 0 || self.crypt_low.key() != 0
    }

    /// Bytes to write to the module, including raw key bytes.
    pub(crate) fn write_values(&self) -> [u8; REGISTER_COUNT] {
        let mut values = self.values();
        values[RegisterAddress::CryptHigh.index() as usize] = self.crypt_high.key();
        values[RegisterAddress::CryptLow.index() as usize] = self.crypt_low.key();
        values
    }

    pub const fn address(&self) -> u16 {
        u16::from_be_bytes([self.address_high, self.address_low])
    }

    /// Host link settings the module uses outside sleep mode
    pub const fn serial_settings(&self) -> SerialSettings {
        self.reg0.serial_settings()
    }
}

impl PartialEq for RegisterBank {
    fn eq(&self, other: &Self) -> bool {
        self.values() == other.values()
    }
}

impl Eq for RegisterBank {}

impl fmt::Display for RegisterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Module address {:#06x}", self.address())?;
        for address in RegisterAddress::ALL {
            write!(
                f,
                "{:02X}H {:<7} {:#04x}",
                address.index(),
                address.name(),
                self.get(address)
            )?;
            match address {
                RegisterAddress::Reg0 => write!(
                    f,
                    "  UART {} {}, air rate {}",
                    self.reg0.baud_rate, self.reg0.parity, self.reg0.air_data_rate
                )?,
                RegisterAddress::Reg1 => write!(
                    f,
                    "  sub-packet {}, ambient noise RSSI {}, power {}",
                    self.reg1.sub_packet,
                    on_off(self.reg1.ambient_noise_rssi),
                    self.reg1.transmit_power
                )?,
                RegisterAddress::Reg2 => write!(
                    f,
                    "  channel {} ({:.3} MHz)",
                    self.reg2.channel(),
                    self.reg2.frequency_mhz()
                )?,
                RegisterAddress::Reg3 => write!(
                    f,
                    "  packet RSSI {}, {} transmission, LBT {}, WOR {}",
                    on_off(self.reg3.rssi_enabled),
                    self.reg3.transmission,
                    on_off(self.reg3.lbt_enabled),
                    self.reg3.wor_cycle
                )?,
                RegisterAddress::CryptHigh | RegisterAddress::CryptLow => {
                    write!(f, "  write-only")?
                }
                _ => {}
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
