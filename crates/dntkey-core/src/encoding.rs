//! Shared byte/text encodings: hex, versioned Base58Check and canonical JSON.

use serde::Serialize;

/// Decode a hex string into a fixed-size array.
///
/// Accepts upper- and lower-case digits. Returns `None` on any length or
/// alphabet mismatch.
pub fn decode_hex_array<const N: usize>(s: &str) -> Option<[u8; N]> {
    if s.len() != N * 2 {
        return None;
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(s, &mut out).ok()?;
    Some(out)
}

/// Base58Check-encode `version || payload`.
///
/// The 4-byte checksum is the leading bytes of SHA256d over the versioned
/// payload.
pub fn encode_versioned(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + payload.len());
    data.push(version);
    data.extend_from_slice(payload);
    bitcoin::base58::encode_check(&data)
}

/// Decode a Base58Check string and split off the version byte.
///
/// `payload_len` is the expected length *excluding* version and checksum.
/// Returns `None` on bad alphabet, bad checksum, wrong length or wrong
/// version.
pub fn decode_versioned(s: &str, version: u8, payload_len: usize) -> Option<Vec<u8>> {
    let data = bitcoin::base58::decode_check(s).ok()?;
    if data.len() != 1 + payload_len || data[0] != version {
        return None;
    }
    Some(data[1..].to_vec())
}

/// Compact JSON with field order taken from the serialized type.
///
/// Struct fields serialize in declaration order and there is no insignificant
/// whitespace, so equal values always produce equal bytes.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Serde helper: `Vec<u8>` as a lowercase hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper: `[u8; N]` as a lowercase hex string of exactly `2N` chars.
pub mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_hex_array::<N>(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("expected {} hex bytes", N)))
    }
}
