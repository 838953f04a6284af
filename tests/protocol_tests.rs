//! Register command codec and inbound packet decoding.

use ebyte_rs::e22::{
    decode_message, encode_get_request, parse_response, Command, RegisterBank,
};
use ebyte_rs::EbyteError;

#[test]
fn test_command_bytes() {
    assert_eq!(Command::SetPermanent.byte(), 0xC0);
    assert_eq!(Command::Get.byte(), 0xC1);
    assert_eq!(Command::SetTemporary.byte(), 0xC2);
    assert_eq!(Command::from_byte(0xC1), Some(Command::Get));
    assert_eq!(Command::from_byte(0xFF), None);
}

#[test]
fn test_get_request_reads_six_registers() {
    assert_eq!(encode_get_request(), vec![0xC1, 0x00, 0x06]);
}

#[test]
fn test_parse_full_response() {
    let response = parse_response(&[0xC1, 0x00, 0x06, 0x01, 0x02, 0x62, 0x00, 0x12, 0x03]).unwrap();
    assert_eq!(response.command, 0xC1);
    assert_eq!(response.start_address, 0x00);
    assert_eq!(response.params, vec![0x01, 0x02, 0x62, 0x00, 0x12, 0x03]);

    let mut bank = RegisterBank::default();
    response.apply_to(&mut bank).unwrap();
    assert_eq!(bank.address(), 0x0102);
    assert_eq!(bank.reg2.channel(), 18);
}

#[test]
fn test_parse_partial_response_from_offset() {
    let response = parse_response(&[0xC1, 0x04, 0x01, 0x17]).unwrap();

    let mut bank = RegisterBank::from_values([0x01, 0x02, 0x62, 0x00, 0x12, 0x03, 0x00, 0x00]);
    response.apply_to(&mut bank).unwrap();
    assert_eq!(bank.values(), [0x01, 0x02, 0x62, 0x00, 0x17, 0x03, 0x00, 0x00]);
}

#[test]
fn test_parse_discards_trailing_bytes() {
    let response = parse_response(&[0xC1, 0x00, 0x01, 0x05, 0xAA, 0xBB]).unwrap();
    assert_eq!(response.params, vec![0x05]);
}

#[test]
fn test_short_responses_rejected() {
    for data in [&[][..], &[0xC1][..], &[0xC1, 0x00][..], &[0xC1, 0x00, 0x06][..]] {
        assert!(
            matches!(parse_response(data), Err(EbyteError::Framing(_))),
            "accepted {data:02X?}"
        );
    }
}

#[test]
fn test_declared_count_larger_than_payload() {
    let err = parse_response(&[0xC1, 0x00, 0x06, 0x01, 0x02]).unwrap_err();
    match err {
        EbyteError::Framing(msg) => assert!(msg.contains("declares 6 parameters but carries 2")),
        other => panic!("expected framing error, got {other:?}"),
    }
}

#[test]
fn test_response_past_bank_rejected_on_apply() {
    let response = parse_response(&[0xC1, 0x07, 0x02, 0x00, 0x00]).unwrap();
    let mut bank = RegisterBank::default();
    assert!(matches!(response.apply_to(&mut bank), Err(EbyteError::Framing(_))));
}

#[test]
fn test_decode_message_rssi_handling() {
    let message = decode_message(b"ping\xC8", true).unwrap();
    assert_eq!(message.payload_str(), Some("ping"));
    assert_eq!(message.rssi_dbm(), Some(-56));

    let message = decode_message(b"ping", false).unwrap();
    assert_eq!(message.payload, b"ping");
    assert_eq!(message.rssi_dbm(), None);

    assert!(matches!(decode_message(b"p", true), Err(EbyteError::Framing(_))));
    assert!(matches!(decode_message(b"", true), Err(EbyteError::Framing(_))));
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_parse_response_never_panics(data in proptest::collection::vec(any::<u8>(), 0..32)) {
            let _ = parse_response(&data);
        }

        #[test]
        fn prop_parse_response_params_match_declared_count(
            command in any::<u8>(),
            start in any::<u8>(),
            params in proptest::collection::vec(any::<u8>(), 1..16),
        ) {
            let mut data = vec![command, start, params.len() as u8];
            data.extend_from_slice(&params);

            let response = parse_response(&data).unwrap();
            prop_assert_eq!(response.command, command);
            prop_assert_eq!(response.start_address, start);
            prop_assert_eq!(response.params, params);
        }

        #[test]
        fn prop_decode_with_rssi_splits_last_byte(data in proptest::collection::vec(any::<u8>(), 2..64)) {
            let message = decode_message(&data, true).unwrap();
            prop_assert_eq!(message.payload.as_slice(), &data[..data.len() - 1]);
            prop_assert_eq!(message.rssi, data[data.len() - 1]);
        }
    }
}
