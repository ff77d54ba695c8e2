//! DNTKey Core
//!
//! Key material, addresses and transaction signing for a single-address
//! DNT wallet.
//!
//! # Key Derivation
//!
//! - Random secp256k1 scalar, or a raw 64-hex-character private key
//! - 12-word mnemonic: private key = SHA-256 of the phrase (non-BIP39)
//! - Address: Base58Check(`0x1E` || HASH160(compressed pubkey))
//!
//! # Encrypted Storage
//!
//! Secrets are encrypted at rest using PBKDF2-HMAC-SHA256 + AES-256-GCM.

pub mod address;
pub mod crypto;
pub mod encoding;
pub mod keys;
pub mod memory;
pub mod mnemonic;
pub mod tx;

pub use address::{derive_address, validate_address, Address, AddressError};
pub use crypto::{decrypt, derive_symmetric_key, encrypt, CryptoError, EncryptedSecret};
pub use keys::{generate_key_pair, import_from_private_key, KeyError, KeyPair};
pub use mnemonic::{
    generate_mnemonic, keypair_from_mnemonic, mnemonic_to_private_key, Mnemonic, MnemonicError,
};
pub use tx::{
    canonicalize, hash_transaction, sign, sign_transaction, verify, verify_signed_transaction,
    SignedTransaction, TokenType, Transaction, TxError,
};
