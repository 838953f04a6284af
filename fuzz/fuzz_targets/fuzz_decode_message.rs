#![no_main]

use ebyte_rs::e22::decode_message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = decode_message(data, true) {
        assert_eq!(message.payload.len() + 1, data.len());
    }

    let message = decode_message(data, false);
    assert!(matches!(message, Ok(ref m) if m.payload == data));
});
