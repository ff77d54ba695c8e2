//! Password-based secret encryption
//!
//! PBKDF2-HMAC-SHA256 (100 000 rounds) derives an AES-256-GCM key from the
//! user's password and a per-encryption salt.
//!
//! # Security Notes
//!
//! - Every encryption draws a fresh 32-byte salt and 12-byte IV, so the same
//!   plaintext never encrypts to the same bytes twice
//! - AES-256-GCM authenticates the ciphertext; any tag failure is reported as
//!   the single `DecryptionFailed` error whether the password was wrong or
//!   the data was altered
//! - Password is never stored

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::encoding::{hex_array, hex_bytes};
use crate::memory::LockedBuffer;

/// PBKDF2 iteration count
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Derived key length (AES-256)
pub const KEY_LEN: usize = 32;

/// Salt length for PBKDF2
pub const SALT_LEN: usize = 32;

/// IV length for AES-256-GCM
pub const IV_LEN: usize = 12;

/// GCM authentication tag length
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),
    /// Wrong password or corrupted data. Deliberately carries no detail.
    #[error("Incorrect password")]
    DecryptionFailed,
    #[error("Invalid ciphertext format")]
    InvalidFormat,
}

/// An encrypted secret as stored at rest.
///
/// JSON form: `{"ciphertext": hex, "salt": hex, "iv": hex}`.
/// Binary form: `[salt (32)][iv (12)][ciphertext + tag]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Encrypted payload + authentication tag
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    /// Salt used for PBKDF2
    #[serde(with = "hex_array")]
    pub salt: [u8; SALT_LEN],
    /// IV used for AES-256-GCM
    #[serde(with = "hex_array")]
    pub iv: [u8; IV_LEN],
}

impl EncryptedSecret {
    /// Serialize to bytes: salt || iv || ciphertext
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SALT_LEN + IV_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        // salt + iv + at least 1 byte of ciphertext + tag
        if bytes.len() < SALT_LEN + IV_LEN + TAG_LEN + 1 {
            return Err(CryptoError::InvalidFormat);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);
        iv.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + IV_LEN]);

        Ok(Self {
            ciphertext: bytes[SALT_LEN + IV_LEN..].to_vec(),
            salt,
            iv,
        })
    }
}

/// Derive the AES key for `password` and `salt`. Deterministic.
pub fn derive_symmetric_key(password: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key[..]);
    key
}

/// Encrypt `plaintext` under `password` with a fresh salt and IV.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<EncryptedSecret, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .and_then(|_| OsRng.try_fill_bytes(&mut iv))
        .map_err(|e| CryptoError::EncryptionFailure(format!("entropy source: {}", e)))?;

    let key = derive_symmetric_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::EncryptionFailure(e.to_string()))?;

    Ok(EncryptedSecret {
        ciphertext,
        salt,
        iv,
    })
}

/// Decrypt with the stored salt and IV.
///
/// The plaintext is returned in a memory-locked buffer that is zeroized on
/// drop. Every failure maps to `DecryptionFailed`.
pub fn decrypt(encrypted: &EncryptedSecret, password: &str) -> Result<LockedBuffer, CryptoError> {
    let key = derive_symmetric_key(password, &encrypted.salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&encrypted.iv),
            encrypted.ciphertext.as_slice(),
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Ok(LockedBuffer::from_slice(&plaintext))
}
