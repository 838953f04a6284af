//! # E22 Command Protocol
//!
//! Register access uses a three-byte header followed by parameters:
//!
//! ```text
//! ┌─────────┬───────────────┬─────────────┬──────────────────┐
//! │ command │ start address │ param count │ params ...       │
//! └─────────┴───────────────┴─────────────┴──────────────────┘
//! ```
//!
//! There is no checksum. The module answers every command with the same
//! layout and command byte 0xC1, echoing the registers it now holds.

use crate::constants::{
    CMD_GET_REGISTERS, CMD_SET_REGISTERS_PERMANENT, CMD_SET_REGISTERS_TEMPORARY, FRAME_HEADER_LEN,
    MIN_RESPONSE_LEN, READABLE_REGISTER_COUNT, REGISTER_COUNT,
};
use crate::e22::registers::{RegisterAddress, RegisterBank};
use crate::error::EbyteError;
use crate::util::logging::span_frame;
use log::debug;
use nom::multi::length_data;
use nom::number::complete::be_u8;
use nom::sequence::tuple;
use nom::IResult;

/// Command bytes understood by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write registers, kept across power cycles
    SetPermanent,
    /// Read registers
    Get,
    /// Write registers until the next power cycle
    SetTemporary,
}

impl Command {
    pub const fn byte(self) -> u8 {
        match self {
            Command::SetPermanent => CMD_SET_REGISTERS_PERMANENT,
            Command::Get => CMD_GET_REGISTERS,
            Command::SetTemporary => CMD_SET_REGISTERS_TEMPORARY,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_SET_REGISTERS_PERMANENT => Some(Command::SetPermanent),
            CMD_GET_REGISTERS => Some(Command::Get),
            CMD_SET_REGISTERS_TEMPORARY => Some(Command::SetTemporary),
            _ => None,
        }
    }
}

/// A parsed register response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipResponse {
    pub command: u8,
    pub start_address: u8,
    pub params: Vec<u8>,
}

impl ChipResponse {
    /// Store the echoed parameters into `bank`.
    pub fn apply_to(&self, bank: &mut RegisterBank) -> Result<(), EbyteError> {
        bank.update(self.start_address, &self.params)
    }
}

/// A packet received over the air
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub payload: Vec<u8>,
    /// Raw RSSI byte; 0 when the module does not append one
    pub rssi: u8,
}

impl Message {
    /// Signal strength in dBm, if the module reported one.
    pub fn rssi_dbm(&self) -> Option<i16> {
        match self.rssi {
            0 => None,
            rssi => Some(-(256 - i16::from(rssi))),
        }
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Read the six host-readable registers from address 0.
pub fn encode_get_request() -> Vec<u8> {
    vec![
        Command::Get.byte(),
        RegisterAddress::AddressHigh.index(),
        READABLE_REGISTER_COUNT,
    ]
}

/// Write `bank` from address 0.
///
/// The key registers are only included when the bank carries a key, so an
/// existing key on the module is left alone otherwise.
pub fn encode_set_request(bank: &RegisterBank, temporary: bool) -> Vec<u8> {
    let command = if temporary {
        Command::SetTemporary
    } else {
        Command::SetPermanent
    };
    let count = if bank.has_crypt_key() {
        REGISTER_COUNT
    } else {
        READABLE_REGISTER_COUNT as usize
    };

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + count);
    frame.extend([
        command.byte(),
        RegisterAddress::AddressHigh.index(),
        count as u8,
    ]);
    frame.extend_from_slice(&bank.write_values()[..count]);
    frame
}

fn response_frame(input: &[u8]) -> IResult<&[u8], ChipResponse> {
    let (rest, (command, start_address, params)) = tuple((be_u8, be_u8, length_data(be_u8)))(input)?;
    Ok((
        rest,
        ChipResponse {
            command,
            start_address,
            params: params.to_vec(),
        },
    ))
}

/// Parse a register response out of one read buffer.
///
/// Bytes after the declared parameters are discarded.
pub fn parse_response(data: &[u8]) -> Result<ChipResponse, EbyteError> {
    let _span = span_frame("response");
    if data.len() < MIN_RESPONSE_LEN {
        return Err(EbyteError::Framing(format!(
            "response too short: {} bytes, need at least {MIN_RESPONSE_LEN}",
            data.len()
        )));
    }

    match response_frame(data) {
        Ok((trailing, response)) => {
            if !trailing.is_empty() {
                debug!("Discarding {} trailing bytes after response", trailing.len());
            }
            Ok(response)
        }
        Err(nom::Err::Incomplete(_)) => Err(EbyteError::Framing(format!(
            "response declares {} parameters but carries {}",
            data[2],
            data.len() - FRAME_HEADER_LEN
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Split a received packet into payload and RSSI.
///
/// With RSSI enabled the module appends the RSSI as the last byte, so at
/// least two bytes are required.
pub fn decode_message(data: &[u8], rssi_enabled: bool) -> Result<Message, EbyteError> {
    let _span = span_frame("message");
    if !rssi_enabled {
        return Ok(Message {
            payload: data.to_vec(),
            rssi: 0,
        });
    }

    match data.split_last() {
        Some((rssi, payload)) if !payload.is_empty() => Ok(Message {
            payload: payload.to_vec(),
            rssi: *rssi,
        }),
        _ => Err(EbyteError::Framing(format!(
            "message of {} bytes cannot carry payload and RSSI",
            data.len()
        ))),
    }
}
