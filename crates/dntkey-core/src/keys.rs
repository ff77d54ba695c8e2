//! secp256k1 key pairs
//!
//! A key pair is always built from its private scalar; the compressed public
//! key is derived on construction and never accepted on its own.

use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::encoding::decode_hex_array;

/// Length of a raw private key in bytes
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a compressed public key in bytes
pub const PUBLIC_KEY_LEN: usize = 33;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key format: expected 64 hex characters encoding a valid secp256k1 scalar")]
    InvalidKeyFormat,
    #[error("Entropy source failure: {0}")]
    Entropy(String),
}

/// A secp256k1 private key and its compressed public key.
///
/// The private scalar is erased when the pair is dropped.
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Build a key pair from 32 raw private key bytes.
    ///
    /// Zero and values `>= n` are rejected as `InvalidKeyFormat`.
    pub fn from_secret_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidKeyFormat)?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self { secret, public })
    }

    /// The raw private key. Wrapped so the copy is wiped when dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        Zeroizing::new(self.secret.secret_bytes())
    }

    /// Lowercase hex private key, for the explicit export path only.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.secret_bytes()[..]))
    }

    /// 33-byte compressed public key.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public.serialize()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key_hex())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh key pair from the operating system CSPRNG.
///
/// Only fails if the entropy source fails; that is fatal for the caller's
/// operation and is not retried here.
pub fn generate_key_pair() -> Result<KeyPair, KeyError> {
    let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    loop {
        OsRng
            .try_fill_bytes(&mut bytes[..])
            .map_err(|e| KeyError::Entropy(e.to_string()))?;
        // Out-of-range draws have probability ~2^-128; draw again.
        if let Ok(pair) = KeyPair::from_secret_bytes(&bytes) {
            return Ok(pair);
        }
    }
}

/// Import a private key given as exactly 64 hex characters (any case).
pub fn import_from_private_key(hex_key: &str) -> Result<KeyPair, KeyError> {
    let bytes = decode_hex_array::<PRIVATE_KEY_LEN>(hex_key)
        .map(Zeroizing::new)
        .ok_or(KeyError::InvalidKeyFormat)?;
    KeyPair::from_secret_bytes(&bytes)
}
