//! # Hex Helpers
//!
//! Compact hex rendering for frame logs and lenient parsing of hex payloads
//! typed on the command line (`"c1 00 06"`, `"C10006"` and `"c1:00:06"` all
//! decode to the same bytes).

use thiserror::Error;

/// Errors from parsing a hex string
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex digits: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes as a lowercase hex string without separators.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex digits, ignoring whitespace and `:`/`-` separators.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as "c1 00 06" for logs.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
