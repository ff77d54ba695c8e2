//! 12-word recovery phrases
//!
//! This is NOT BIP-39. Words are drawn independently (with replacement) from
//! the English BIP-39 word list and carry no checksum. The private key is
//! `SHA256(phrase)`, so a mistyped word silently yields a different, valid
//! wallet. The scheme is kept as-is for compatibility with existing wallets.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::keys::{KeyError, KeyPair, PRIVATE_KEY_LEN};

/// Number of words in a phrase
pub const MNEMONIC_WORDS: usize = 12;

#[derive(Error, Debug)]
pub enum MnemonicError {
    #[error("Invalid mnemonic length: expected 12 words, got {0}")]
    InvalidMnemonicLength(usize),
    #[error("Entropy source failure: {0}")]
    Entropy(String),
}

/// A 12-word phrase. Wiped from memory on drop.
pub struct Mnemonic {
    phrase: Zeroizing<String>,
}

impl Mnemonic {
    /// Parse user input. Only the word count is checked; any whitespace run
    /// separates words and the canonical phrase uses single spaces.
    pub fn parse(input: &str) -> Result<Self, MnemonicError> {
        let words: Vec<&str> = input.split_whitespace().collect();
        if words.len() != MNEMONIC_WORDS {
            return Err(MnemonicError::InvalidMnemonicLength(words.len()));
        }
        Ok(Self {
            phrase: Zeroizing::new(words.join(" ")),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.phrase
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.phrase.split(' ')
    }

    /// `SHA256(utf8(phrase))`
    pub fn to_private_key(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let digest = Sha256::digest(self.phrase.as_bytes());
        let mut key = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        key.copy_from_slice(&digest);
        key
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

/// Draw 12 words uniformly at random from the word list.
pub fn generate_mnemonic() -> Result<Mnemonic, MnemonicError> {
    let list = bip39::Language::English.word_list();
    // 2048 = 2^11, so masking a u16 keeps the draw uniform
    let mask = (list.len() - 1) as u16;

    let mut words = Vec::with_capacity(MNEMONIC_WORDS);
    let mut buf = Zeroizing::new([0u8; 2]);
    for _ in 0..MNEMONIC_WORDS {
        OsRng
            .try_fill_bytes(&mut buf[..])
            .map_err(|e| MnemonicError::Entropy(e.to_string()))?;
        let index = u16::from_le_bytes(*buf) & mask;
        words.push(list[index as usize]);
    }

    Ok(Mnemonic {
        phrase: Zeroizing::new(words.join(" ")),
    })
}

/// Private key for a phrase. Fails with `InvalidMnemonicLength` unless the
/// input has exactly 12 whitespace-separated words.
pub fn mnemonic_to_private_key(
    input: &str,
) -> Result<Zeroizing<[u8; PRIVATE_KEY_LEN]>, MnemonicError> {
    Ok(Mnemonic::parse(input)?.to_private_key())
}

/// Key pair for a phrase.
pub fn keypair_from_mnemonic(mnemonic: &Mnemonic) -> Result<KeyPair, KeyError> {
    KeyPair::from_secret_bytes(&mnemonic.to_private_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str =
        "abandon ability able about above absent absorb abstract absurd abuse access accident";

    #[test]
    fn test_generate_has_twelve_listed_words() {
        let list = bip39::Language::English.word_list();
        let m = generate_mnemonic().unwrap();
        assert_eq!(m.words().count(), MNEMONIC_WORDS);
        assert!(m.words().all(|w| list.iter().any(|l| *l == w)));
    }

    #[test]
    fn test_generate_is_random() {
        let a = generate_mnemonic().unwrap();
        let b = generate_mnemonic().unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_private_key_is_sha256_of_phrase() {
        let key = mnemonic_to_private_key(PHRASE).unwrap();
        assert_eq!(
            hex::encode(&key[..]),
            "68c6ab3eba220da70c0fc012ba5f1b6107a8b5a24a4a7b7354984d6e7aa2137b"
        );
    }

    #[test]
    fn test_whitespace_is_normalised() {
        let messy = format!("  {}\n", PHRASE.replace(' ', " \t "));
        assert_eq!(
            *mnemonic_to_private_key(&messy).unwrap(),
            *mnemonic_to_private_key(PHRASE).unwrap()
        );
    }

    #[test]
    fn test_wrong_word_count_rejected() {
        let eleven = PHRASE.rsplit_once(' ').unwrap().0;
        assert!(matches!(
            mnemonic_to_private_key(eleven),
            Err(MnemonicError::InvalidMnemonicLength(11))
        ));
        let thirteen = format!("{} zoo", PHRASE);
        assert!(matches!(
            mnemonic_to_private_key(&thirteen),
            Err(MnemonicError::InvalidMnemonicLength(13))
        ));
        assert!(matches!(
            mnemonic_to_private_key(""),
            Err(MnemonicError::InvalidMnemonicLength(0))
        ));
    }

    #[test]
    fn test_no_checksum_means_typos_derive_other_wallets() {
        // Words outside the list are accepted: there is no checksum to catch them
        let typo = PHRASE.replace("accident", "accidant");
        let a = keypair_from_mnemonic(&Mnemonic::parse(PHRASE).unwrap()).unwrap();
        let b = keypair_from_mnemonic(&Mnemonic::parse(&typo).unwrap()).unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_generated_phrase_reimports_to_same_key() {
        let m = generate_mnemonic().unwrap();
        let a = keypair_from_mnemonic(&m).unwrap();
        let b = keypair_from_mnemonic(&Mnemonic::parse(m.as_str()).unwrap()).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_debug_redacts_phrase() {
        let m = Mnemonic::parse(PHRASE).unwrap();
        assert!(!format!("{:?}", m).contains("abandon"));
    }
}
