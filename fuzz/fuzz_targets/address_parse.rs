#![no_main]

use dntkey_core::address::{validate_address, Address};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // validate_address never errors, and agrees with the typed parser.
    if let Ok(s) = std::str::from_utf8(data) {
        let valid = validate_address(s);
        let parsed = s.parse::<Address>();
        assert_eq!(valid, parsed.is_ok());
        if let Ok(address) = parsed {
            assert_eq!(address.as_str(), s);
            assert!(s.starts_with('D'));
        }
    }
});
