//! Unit tests for the hex helpers used by the CLI and frame logs.

use ebyte_rs::util::{decode_hex, encode_hex, format_hex_compact, HexError};

/// Tests that a SET frame typed on the command line decodes byte for byte.
#[test]
fn test_decode_command_line_frame() {
    let frame = decode_hex("C0 00 06 00 03 62 00 17 03").unwrap();
    assert_eq!(frame, vec![0xC0, 0x00, 0x06, 0x00, 0x03, 0x62, 0x00, 0x17, 0x03]);
    assert_eq!(decode_hex("c0-00-06").unwrap(), vec![0xC0, 0x00, 0x06]);
}

/// Tests the error cases of `decode_hex()`.
#[test]
fn test_decode_errors() {
    assert_eq!(decode_hex("  "), Err(HexError::EmptyString));
    assert_eq!(decode_hex("c10"), Err(HexError::OddLength(3)));
    assert!(matches!(decode_hex("zz"), Err(HexError::DecodeError(_))));
}

/// Tests both renderings of the same bytes.
#[test]
fn test_encode_formats() {
    let data = [0xC1, 0x00, 0x06];
    assert_eq!(encode_hex(&data), "c10006");
    assert_eq!(format_hex_compact(&data), "c1 00 06");
    assert_eq!(decode_hex(&format_hex_compact(&data)).unwrap(), data);
}
