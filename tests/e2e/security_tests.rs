//! Security-specific tests.
//!
//! These tests verify:
//! 1. Encrypted secrets reject wrong passwords and any tampering
//! 2. Secrets never reach persisted records in the clear
//! 3. Malformed inputs don't panic
//! 4. Address checksums catch corruption
//! 5. Signatures bind every transaction field

use dntkey_core::crypto::{decrypt, encrypt, EncryptedSecret};
use dntkey_core::{
    derive_address, generate_key_pair, hash_transaction, import_from_private_key,
    mnemonic_to_private_key, sign, sign_transaction, validate_address, verify,
    verify_signed_transaction, Mnemonic, TokenType, Transaction,
};
use dntkey_vault::{KvStore, MemoryStore, Settings, SqliteStore, Wallet};
use std::sync::Arc;
use zeroize::Zeroize;

// ============================================================================
// 1. Secret Encryption Security Tests
// ============================================================================

#[test]
fn test_wrong_password_fails_decryption() {
    let encrypted = encrypt(b"payload", "correct horse battery staple").unwrap();
    assert!(decrypt(&encrypted, "wrong horse battery staple").is_err());
}

#[test]
fn test_tampered_salt_fails_decryption() {
    let encrypted = encrypt(b"payload", "test password").unwrap();
    let mut bytes = encrypted.to_bytes();

    // Salt is the first 32 bytes
    bytes[0] ^= 0xFF;

    let tampered = EncryptedSecret::from_bytes(&bytes).unwrap();
    assert!(decrypt(&tampered, "test password").is_err());
}

#[test]
fn test_tampered_iv_fails_decryption() {
    let encrypted = encrypt(b"payload", "test password").unwrap();
    let mut bytes = encrypted.to_bytes();

    // IV is bytes 32..44
    bytes[32] ^= 0xFF;

    let tampered = EncryptedSecret::from_bytes(&bytes).unwrap();
    assert!(decrypt(&tampered, "test password").is_err());
}

#[test]
fn test_every_single_bit_flip_detected() {
    let encrypted = encrypt(b"{\"privateKey\":\"ab\"}", "pw").unwrap();
    let bytes = encrypted.to_bytes();

    // One bit per byte keeps the KDF count manageable
    for i in 0..bytes.len() {
        let mut flipped = bytes.clone();
        flipped[i] ^= 1 << (i % 8);
        let tampered = EncryptedSecret::from_bytes(&flipped).unwrap();
        assert!(decrypt(&tampered, "pw").is_err(), "flip at byte {} accepted", i);
    }
}

#[test]
fn test_truncated_ciphertext_fails() {
    let encrypted = encrypt(b"a longer secret payload", "pw").unwrap();
    let bytes = encrypted.to_bytes();
    let truncated = EncryptedSecret::from_bytes(&bytes[..bytes.len() - 1]).unwrap();
    assert!(decrypt(&truncated, "pw").is_err());
}

#[test]
fn test_double_encryption_distinct_and_both_decrypt() {
    let a = encrypt(b"same", "pw").unwrap();
    let b = encrypt(b"same", "pw").unwrap();
    assert_ne!(a.to_bytes(), b.to_bytes());
    assert_eq!(decrypt(&a, "pw").unwrap().as_slice(), b"same");
    assert_eq!(decrypt(&b, "pw").unwrap().as_slice(), b"same");
}

#[test]
fn test_wrong_password_errors_are_uniform() {
    let encrypted = encrypt(b"payload", "correct password").unwrap();

    let wrong_passwords = [
        "wrong1",
        "",
        &"a".repeat(1000),
        "correct passwor",   // Off by one
        "correct password ", // Extra space
    ];

    for wp in &wrong_passwords {
        let err = decrypt(&encrypted, wp).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect password");
    }
}

// ============================================================================
// 2. Secrets At Rest
// ============================================================================

#[test]
fn test_database_file_never_contains_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallet.db");
    let phrase = "abandon ability able about above absent absorb abstract absurd abuse access accident";

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let wallet = Wallet::new(
            store,
            Arc::new(dntkey_vault::SystemClock),
            Settings::default(),
        );
        wallet.import_mnemonic(phrase, "pw").unwrap();
    }

    let key_hex = hex::encode(&mnemonic_to_private_key(phrase).unwrap()[..]);
    let mut raw = Vec::new();
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        raw.extend(std::fs::read(entry.unwrap().path()).unwrap());
    }
    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains(&key_hex));
    assert!(!haystack.contains("absurd abuse"));
}

#[test]
fn test_store_notifications_never_carry_plaintext() {
    let store = Arc::new(MemoryStore::new());
    let mut rx = store.subscribe();
    let wallet = Wallet::new(
        Arc::clone(&store),
        Arc::new(dntkey_vault::SystemClock),
        Settings::default(),
    );
    let key = "f1b07e32f1f1bdaf5efa886e6511c91e187138905b3f96600304d8535fbefa6d";
    wallet.import_private_key(key, "pw").unwrap();

    while let Ok(change) = rx.try_recv() {
        let text = change.value.map(|v| v.to_string()).unwrap_or_default();
        assert!(!text.contains(key));
    }
}

#[test]
fn test_zeroize_works_on_key_copy() {
    let pair = generate_key_pair().unwrap();
    let mut copy = *pair.secret_bytes();
    assert!(copy.iter().any(|&b| b != 0));
    copy.zeroize();
    assert!(copy.iter().all(|&b| b == 0));
}

// ============================================================================
// 3. Malformed Input Panic Tests (should NOT panic)
// ============================================================================

#[test]
fn test_parse_mnemonic_garbage_does_not_panic() {
    let inputs = [
        "",
        "a",
        "abandon abandon abandon", // Too few words
        &"abandon ".repeat(100),   // Too many words
        "🎉 🎊 🎈 🎃 🎄 🎅 🎆 🎇 🎁 🎂 🎀 🎍", // Unicode, 12 tokens
        "\0\0\0\0\0\0\0\0\0\0\0\0", // Null bytes
        &"a".repeat(10000),          // Very long
    ];

    for input in &inputs {
        let _ = Mnemonic::parse(input);
        let _ = mnemonic_to_private_key(input);
    }
}

#[test]
fn test_import_key_garbage_does_not_panic() {
    let inputs = [
        "",
        "0x",
        "zz",
        &"0".repeat(64),
        &"g".repeat(64),
        &"f".repeat(65),
        "ééééééééééééééééééééééééééééééééééééééééééééééééééééééééééééééé",
    ];

    for input in &inputs {
        assert!(import_from_private_key(input).is_err());
    }
}

#[test]
fn test_encrypted_secret_from_garbage_bytes_does_not_panic() {
    let inputs: Vec<Vec<u8>> = vec![
        vec![],
        vec![0],
        vec![0; 10],
        vec![0xFF; 100],
        vec![0; 1000],
        (0..255).collect(),
    ];

    for input in &inputs {
        if let Ok(secret) = EncryptedSecret::from_bytes(input) {
            assert!(decrypt(&secret, "pw").is_err());
        }
    }
}

#[test]
fn test_verify_garbage_does_not_panic() {
    let hash = [0u8; 32];
    let pair = generate_key_pair().unwrap();
    assert!(!verify(&hash, &[], &pair.public_key()));
    assert!(!verify(&hash, &[0x30, 0x00], &pair.public_key()));
    assert!(!verify(&hash, &sign(&hash, &pair), &[0x02; 33]));
    assert!(!verify(&hash, &sign(&hash, &pair), &[]));
}

// ============================================================================
// 4. Address Checksum Tests
// ============================================================================

#[test]
fn test_address_fuzz_random_strings() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let alphabet = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    for _ in 0..1000 {
        let len = rng.gen_range(0..60);
        let s: String = (0..len)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect();
        // Should not panic
        let _ = validate_address(&s);
    }
}

#[test]
fn test_address_character_substitution_rejected() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let alphabet = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    let address = derive_address(&generate_key_pair().unwrap().public_key()).to_string();

    for _ in 0..500 {
        let mut chars: Vec<u8> = address.bytes().collect();
        let idx = rng.gen_range(0..chars.len());
        let replacement = alphabet[rng.gen_range(0..alphabet.len())];
        if chars[idx] == replacement {
            continue;
        }
        chars[idx] = replacement;
        let corrupted = String::from_utf8(chars).unwrap();
        assert!(!validate_address(&corrupted), "{} accepted", corrupted);
    }
}

// ============================================================================
// 5. Signature Binding
// ============================================================================

#[test]
fn test_signature_binds_every_field() {
    let pair = generate_key_pair().unwrap();
    let from = derive_address(&pair.public_key());
    let to = derive_address(&generate_key_pair().unwrap().public_key());
    let tx = Transaction {
        from: from.clone(),
        to: to.clone(),
        amount: 100,
        token_type: TokenType::Dnt,
        fee: 1,
        nonce: 9,
    };
    let signed = sign_transaction(&tx, &pair).unwrap();
    assert!(verify_signed_transaction(&signed));

    let variants = [
        Transaction { amount: 101, ..tx.clone() },
        Transaction { fee: 0, ..tx.clone() },
        Transaction { nonce: 10, ..tx.clone() },
        Transaction { token_type: TokenType::Afc, ..tx.clone() },
        Transaction { to: from.clone(), ..tx.clone() },
    ];
    for variant in variants {
        let forged = dntkey_core::SignedTransaction {
            tx: variant,
            ..signed.clone()
        };
        assert!(!verify_signed_transaction(&forged));
    }
}

#[test]
fn test_signature_rejected_for_other_key() {
    let signer = generate_key_pair().unwrap();
    let other = generate_key_pair().unwrap();
    let to = derive_address(&other.public_key());
    let tx = Transaction {
        from: derive_address(&signer.public_key()),
        to,
        amount: 1,
        token_type: TokenType::Afc,
        fee: 0,
        nonce: 0,
    };
    let hash = hash_transaction(&tx).unwrap();
    let sig = sign(&hash, &signer);

    assert!(verify(&hash, &sig, &signer.public_key()));
    assert!(!verify(&hash, &sig, &other.public_key()));
    assert!(sign_transaction(&tx, &other).is_err());
}
