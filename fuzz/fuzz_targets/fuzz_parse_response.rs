#![no_main]

use ebyte_rs::e22::{parse_response, RegisterBank};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed responses must fail without panicking
    let Ok(response) = parse_response(data) else {
        return;
    };

    // Applying must reject ranges past the bank and leave it intact
    let mut bank = RegisterBank::default();
    let before = bank.values();
    if response.apply_to(&mut bank).is_err() {
        assert_eq!(bank.values(), before);
    }

    // Count field disagreeing with the payload length
    if data.len() > 3 {
        let mut mutated = data.to_vec();
        mutated[2] = mutated[2].wrapping_add(1);
        let _ = parse_response(&mutated);
    }
});
