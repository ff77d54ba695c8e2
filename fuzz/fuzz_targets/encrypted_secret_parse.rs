#![no_main]

use dntkey_core::crypto::EncryptedSecret;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Binary form: must return Ok or Err, never panic. Whatever parses must
    // serialize back to the same bytes.
    if let Ok(secret) = EncryptedSecret::from_bytes(data) {
        assert_eq!(secret.to_bytes(), data);
    }

    // JSON form as stored in the wallet record
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<EncryptedSecret>(s);
    }
});
