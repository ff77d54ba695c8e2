//! Transaction codec and signer
//!
//! The signable part of a transaction is serialized as compact JSON with the
//! keys in a fixed order:
//!
//! ```text
//! {"from":…,"to":…,"amount":…,"tokenType":…,"fee":…,"nonce":…}
//! ```
//!
//! The transaction hash is SHA-256 over those bytes. Signatures are ECDSA on
//! secp256k1 with RFC 6979 nonces, DER encoded.
//!
//! # Nonce contract
//!
//! `nonce` is the sender's current account nonce as reported by the ledger.
//! This module never tracks or increments nonces; replay protection is the
//! caller's responsibility.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::address::{derive_address, Address, AddressError};
use crate::encoding;
use crate::keys::{KeyPair, PUBLIC_KEY_LEN};

#[derive(Error, Debug)]
pub enum TxError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("Unknown token type: {0}")]
    UnknownToken(String),
    #[error("Signing key does not control sender address {0}")]
    SignerMismatch(Address),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Asset being transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "DNT")]
    Dnt,
    #[serde(rename = "AFC")]
    Afc,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dnt => "DNT",
            Self::Afc => "AFC",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DNT" => Ok(Self::Dnt),
            "AFC" => Ok(Self::Afc),
            _ => Err(TxError::UnknownToken(s.to_string())),
        }
    }
}

/// An unsigned transfer.
///
/// Amounts and fees are integer base units. Unknown JSON fields are ignored
/// on deserialization and never reach the signed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    pub token_type: TokenType,
    pub fee: u64,
    /// Current account nonce, supplied by the ledger and used verbatim
    pub nonce: u64,
}

impl Transaction {
    /// Build a transfer, validating both addresses.
    pub fn new(
        from: &str,
        to: &str,
        amount: u64,
        token_type: TokenType,
        fee: u64,
        nonce: u64,
    ) -> Result<Self, TxError> {
        Ok(Self {
            from: from.parse()?,
            to: to.parse()?,
            amount,
            token_type,
            fee,
            nonce,
        })
    }
}

/// Fixed-order view of the signable fields.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Signable<'a> {
    from: &'a str,
    to: &'a str,
    amount: u64,
    token_type: TokenType,
    fee: u64,
    nonce: u64,
}

impl<'a> From<&'a Transaction> for Signable<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            from: tx.from.as_str(),
            to: tx.to.as_str(),
            amount: tx.amount,
            token_type: tx.token_type,
            fee: tx.fee,
            nonce: tx.nonce,
        }
    }
}

/// A transfer with its signature and the signer's compressed public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub tx: Transaction,
    /// DER signature over `hash_transaction(tx)`
    #[serde(with = "encoding::hex_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "encoding::hex_array")]
    pub public_key: [u8; PUBLIC_KEY_LEN],
}

impl SignedTransaction {
    pub fn hash(&self) -> Result<[u8; 32], TxError> {
        hash_transaction(&self.tx)
    }
}

/// Deterministic byte encoding of the signable fields.
pub fn canonicalize(tx: &Transaction) -> Result<Vec<u8>, TxError> {
    Ok(encoding::to_canonical_json(&Signable::from(tx))?)
}

/// `SHA256(canonicalize(tx))`
pub fn hash_transaction(tx: &Transaction) -> Result<[u8; 32], TxError> {
    let bytes = canonicalize(tx)?;
    Ok(Sha256::digest(&bytes).into())
}

/// ECDSA-sign a 32-byte hash. Returns the DER-encoded signature.
pub fn sign(hash: &[u8; 32], key: &KeyPair) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest(*hash);
    secp.sign_ecdsa(&msg, key.secret_key())
        .serialize_der()
        .to_vec()
}

/// Verify a DER signature against a hash and compressed public key.
///
/// Any malformed signature or key yields `false`.
pub fn verify(hash: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(mut sig) = Signature::from_der(signature) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_slice(public_key) else {
        return false;
    };
    // libsecp256k1 only accepts low-S; plain ECDSA accepts either form
    sig.normalize_s();
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&Message::from_digest(*hash), &sig, &pk)
        .is_ok()
}

/// Hash, sign and attach the signature plus the signer's public key.
///
/// The key must control `tx.from`.
pub fn sign_transaction(tx: &Transaction, key: &KeyPair) -> Result<SignedTransaction, TxError> {
    let public_key = key.public_key();
    if derive_address(&public_key) != tx.from {
        return Err(TxError::SignerMismatch(tx.from.clone()));
    }
    let hash = hash_transaction(tx)?;
    Ok(SignedTransaction {
        tx: tx.clone(),
        signature: sign(&hash, key),
        public_key,
    })
}

/// Check that the attached key controls `from` and signed these exact fields.
pub fn verify_signed_transaction(signed: &SignedTransaction) -> bool {
    if derive_address(&signed.public_key) != signed.tx.from {
        return false;
    }
    match signed.hash() {
        Ok(hash) => verify(&hash, &signed.signature, &signed.public_key),
        Err(_) => false,
    }
}
