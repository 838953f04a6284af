//! # EByte E22 Module Support
//!
//! Register model, command codec, device controller and configuration
//! builder for the E22 family (E22-900T22S and relatives).

pub mod config_builder;
pub mod module;
pub mod protocol;
pub mod registers;

pub use config_builder::ConfigBuilder;
pub use module::{E22Module, MessageCallback};
pub use protocol::{
    decode_message, encode_get_request, encode_set_request, parse_response, ChipResponse, Command,
    Message,
};
pub use registers::{
    AirDataRate, CryptByte, Reg0, Reg1, Reg2, Reg3, RegisterAddress, RegisterBank, SubPacketSize,
    TransmissionMethod, TransmitPower, UartBaudRate, UartParity, WorCycle,
};
