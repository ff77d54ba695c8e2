#![no_main]

use dntkey_core::mnemonic::{keypair_from_mnemonic, Mnemonic, MNEMONIC_WORDS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only the word count is validated; anything with 12 tokens is a phrase.
    if let Ok(s) = std::str::from_utf8(data) {
        match Mnemonic::parse(s) {
            Ok(m) => {
                assert_eq!(m.words().count(), MNEMONIC_WORDS);
                let _ = keypair_from_mnemonic(&m);
            }
            Err(_) => assert_ne!(s.split_whitespace().count(), MNEMONIC_WORDS),
        }
    }
});
