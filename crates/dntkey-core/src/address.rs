//! DNT addresses
//!
//! `Base58Check(0x1E || RIPEMD160(SHA256(compressed_pubkey)))`, 25 bytes
//! decoded including the 4-byte checksum. The version byte makes every
//! address start with `D`.

use bitcoin::hashes::{hash160, Hash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::encoding::{decode_versioned, encode_versioned};
use crate::keys::PUBLIC_KEY_LEN;

/// Address version byte
pub const ADDRESS_VERSION: u8 = 0x1E;

/// HASH160 payload length
const HASH160_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),
}

/// A validated DNT address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    encoded: String,
    hash: [u8; HASH160_LEN],
}

impl Address {
    /// The 20-byte public key hash carried by this address.
    pub fn hash160(&self) -> &[u8; HASH160_LEN] {
        &self.hash
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encoded)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = decode_versioned(s, ADDRESS_VERSION, HASH160_LEN)
            .ok_or_else(|| AddressError::InvalidAddressFormat(s.to_string()))?;
        let mut hash = [0u8; HASH160_LEN];
        hash.copy_from_slice(&payload);
        Ok(Self {
            encoded: s.to_string(),
            hash,
        })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Derive the address of a compressed public key.
pub fn derive_address(public_key: &[u8; PUBLIC_KEY_LEN]) -> Address {
    let hash = hash160::Hash::hash(public_key).to_byte_array();
    Address {
        encoded: encode_versioned(ADDRESS_VERSION, &hash),
        hash,
    }
}

/// Check that `address` is a well-formed DNT address.
///
/// Never errors: bad alphabet, wrong length, wrong version and checksum
/// mismatch all yield `false`.
pub fn validate_address(address: &str) -> bool {
    address.parse::<Address>().is_ok()
}
